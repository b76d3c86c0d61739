use crate::{
    logging_driver::{DriverOp, LoggingDriver},
    ExecLog, Setup,
};
use orma::{driver::Capability, session_factory::Builder, SessionFactory};

use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex},
};

/// Runs one test on a current-thread runtime, always logging driver
/// operations.
pub struct DbTest {
    setup: Box<dyn Setup>,
    ops_log: Arc<Mutex<Vec<DriverOp>>>,
}

impl DbTest {
    pub fn new(setup: Box<dyn Setup>) -> Self {
        Self {
            setup,
            ops_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Try to build a session factory and create its schema
    pub async fn try_setup_db(&mut self, mut builder: Builder) -> orma::Result<SessionFactory> {
        let driver = LoggingDriver::new(self.setup.driver()?);
        self.ops_log = driver.ops_log_handle();

        let factory = builder.build(driver).await?;
        factory.create_schema().await?;

        // Tests only see the statements they cause
        self.ops_log.lock().unwrap().clear();

        Ok(factory)
    }

    pub async fn setup_db(&mut self, builder: Builder) -> SessionFactory {
        self.try_setup_db(builder).await.unwrap()
    }

    /// Get the operations log for assertions
    pub fn log(&self) -> ExecLog {
        ExecLog::new(self.ops_log.clone())
    }

    pub fn capability(&self) -> &'static Capability {
        self.setup.capability()
    }

    /// Run a test function with a mutable reference to self.
    pub fn run_test<F>(&mut self, test_fn: F)
    where
        F: for<'a> FnOnce(&'a mut DbTest) -> Pin<Box<dyn Future<Output = ()> + 'a>>,
    {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("Failed to create Tokio runtime");

        runtime.block_on(test_fn(self));
    }
}
