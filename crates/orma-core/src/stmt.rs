//! Value vocabulary shared by the expression tree, the SQL AST, and drivers.

mod direction;
pub use direction::{Direction, NullPrecedence};

mod join_type;
pub use join_type::JoinType;

mod lock;
pub use lock::LockMode;

mod op_arithmetic;
pub use op_arithmetic::ArithmeticOp;

mod op_binary;
pub use op_binary::BinaryOp;

mod ty;
pub use ty::Type;

mod value;
pub use value::Value;

mod value_record;
pub use value_record::ValueRecord;
