#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use cask_orm::{Connection, Drivers, Error, Row, Value};
use futures::future::BoxFuture;

/// One call the engine made against the connection, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Execute(String, Vec<Value>),
    Query(String, Vec<Value>),
}

/// What the connection answers next.
pub enum Reply {
    Affected(u64),
    Rows(Vec<Row>),
    Fail(String),
}

/// An in-process connection that records every call and answers from a
/// scripted reply queue. With the queue empty, executes affect one row and
/// queries return nothing.
pub struct ScriptedConnection {
    driver: Drivers,
    calls: Mutex<Vec<Call>>,
    replies: Mutex<VecDeque<Reply>>,
}

impl ScriptedConnection {
    pub fn new(driver: Drivers) -> Self {
        Self {
            driver,
            calls: Mutex::new(Vec::new()),
            replies: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push_affected(&self, rows: u64) {
        self.replies.lock().unwrap().push_back(Reply::Affected(rows));
    }

    pub fn push_rows(&self, rows: Vec<Row>) {
        self.replies.lock().unwrap().push_back(Reply::Rows(rows));
    }

    pub fn push_scalar(&self, value: impl Into<Value>) {
        self.push_rows(vec![Row::new().with("value", value)]);
    }

    pub fn push_failure(&self, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Reply::Fail(message.to_string()));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn next_reply(&self) -> Option<Reply> {
        self.replies.lock().unwrap().pop_front()
    }
}

impl Connection for ScriptedConnection {
    fn driver(&self) -> Drivers {
        self.driver
    }

    fn execute<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<u64, Error>> {
        Box::pin(async move {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Execute(sql.to_string(), params.to_vec()));
            match self.next_reply() {
                None => Ok(1),
                Some(Reply::Affected(rows)) => Ok(rows),
                Some(Reply::Fail(message)) => Err(Error::Connection(message)),
                Some(Reply::Rows(_)) => Err(Error::Connection(
                    "scripted reply mismatch: execute got rows".to_string(),
                )),
            }
        })
    }

    fn query<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<Vec<Row>, Error>> {
        Box::pin(async move {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Query(sql.to_string(), params.to_vec()));
            match self.next_reply() {
                None => Ok(Vec::new()),
                Some(Reply::Rows(rows)) => Ok(rows),
                Some(Reply::Fail(message)) => Err(Error::Connection(message)),
                Some(Reply::Affected(_)) => Err(Error::Connection(
                    "scripted reply mismatch: query got an affected count".to_string(),
                )),
            }
        })
    }
}
