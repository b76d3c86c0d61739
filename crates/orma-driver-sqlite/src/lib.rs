mod value;
pub(crate) use value::Value;

use orma_core::{
    async_trait,
    driver::{
        operation::{Operation, QuerySql, Transaction},
        Capability, Driver, Response,
    },
    stmt, Error, Result,
};
use orma_sql::Serializer;
use rusqlite::{Connection as RusqliteConnection, OpenFlags};
use std::{
    borrow::Cow,
    path::{Path, PathBuf},
    sync::Mutex,
};
use url::Url;

#[derive(Debug)]
pub enum Sqlite {
    File(PathBuf),

    /// A private in-memory database shared by every connection the driver
    /// opens. The database lives as long as the driver.
    InMemory(InMemory),
}

#[derive(Debug)]
pub struct InMemory {
    uri: String,

    /// Keeps the shared database alive while no session is connected
    _keeper: Mutex<RusqliteConnection>,
}

impl Sqlite {
    /// Create a new SQLite driver with an arbitrary connection URL
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url_str = url.into();
        let url = Url::parse(&url_str).map_err(Error::driver_operation_failed)?;

        if url.scheme() != "sqlite" {
            return Err(orma_core::err!(
                "connection URL does not have a `sqlite` scheme; url={url_str}"
            ));
        }

        if url.path() == ":memory:" {
            Self::in_memory()
        } else {
            Ok(Self::File(PathBuf::from(url.path())))
        }
    }

    /// Create an in-memory SQLite database
    pub fn in_memory() -> Result<Self> {
        let uri = format!(
            "file:orma-{}?mode=memory&cache=shared",
            uuid::Uuid::new_v4().simple()
        );
        let keeper = open_uri(&uri)?;

        Ok(Self::InMemory(InMemory {
            uri,
            _keeper: Mutex::new(keeper),
        }))
    }

    /// Open a SQLite database at the specified file path
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self::File(path.as_ref().to_path_buf())
    }
}

#[async_trait]
impl Driver for Sqlite {
    fn url(&self) -> Cow<'_, str> {
        match self {
            Sqlite::InMemory(_) => Cow::Borrowed("sqlite::memory:"),
            Sqlite::File(path) => Cow::Owned(format!("sqlite:{}", path.display())),
        }
    }

    fn capability(&self) -> &'static Capability {
        &Capability::SQLITE
    }

    async fn connect(&self) -> Result<Box<dyn orma_core::Connection>> {
        let connection = match self {
            Sqlite::File(path) => Connection::open(path)?,
            Sqlite::InMemory(in_memory) => Connection {
                connection: open_uri(&in_memory.uri)?,
            },
        };
        Ok(Box::new(connection))
    }
}

fn open_uri(uri: &str) -> Result<RusqliteConnection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;

    RusqliteConnection::open_with_flags(uri, flags).map_err(Error::driver_operation_failed)
}

#[derive(Debug)]
pub struct Connection {
    connection: RusqliteConnection,
}

impl Connection {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let connection = RusqliteConnection::open(path).map_err(Error::driver_operation_failed)?;
        Ok(Self { connection })
    }

    fn transaction(&mut self, op: Transaction) -> Result<Response> {
        let sql = Serializer::sqlite().serialize_transaction(op);
        tracing::trace!(%sql, "sqlite transaction");

        self.connection
            .execute(&sql, [])
            .map_err(Error::driver_operation_failed)?;
        Ok(Response::count(0))
    }

    fn query(&mut self, op: QuerySql) -> Result<Response> {
        let mut stmt = self
            .connection
            .prepare_cached(&op.sql)
            .map_err(Error::driver_operation_failed)?;

        let params = op.params.into_iter().map(Value::from).collect::<Vec<_>>();

        let Some(ret_tys) = op.ret else {
            let count = stmt
                .execute(rusqlite::params_from_iter(params.iter()))
                .map_err(Error::driver_operation_failed)?;

            return Ok(Response::count(count as _));
        };

        let mut rows = stmt
            .query(rusqlite::params_from_iter(params.iter()))
            .map_err(Error::driver_operation_failed)?;

        let mut ret = vec![];

        loop {
            match rows.next() {
                Ok(Some(row)) => {
                    let mut items = Vec::with_capacity(ret_tys.len());

                    for (index, ty) in ret_tys.iter().enumerate() {
                        items.push(Value::from_sql(row, index, ty)?.into_inner());
                    }

                    ret.push(stmt::ValueRecord::from_vec(items));
                }
                Ok(None) => break,
                Err(err) => {
                    return Err(Error::driver_operation_failed(err));
                }
            }
        }

        Ok(Response::values(ret))
    }
}

#[async_trait]
impl orma_core::driver::Connection for Connection {
    async fn exec(&mut self, op: Operation) -> Result<Response> {
        match op {
            Operation::QuerySql(op) => self.query(op),
            Operation::Transaction(op) => self.transaction(op),
        }
    }
}
