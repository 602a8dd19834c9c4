//! Redis-backed queue using `BLPOP` and `RPUSH` on two lists.

use std::time::Duration;

use ::redis::aio::MultiplexedConnection;
use ::redis::{AsyncCommands, RedisError};
use tracing::{debug, info};

use super::{JobQueue, QueueError};
use crate::config::QueueSettings;

/// Queue on a Redis broker.
#[derive(Clone)]
pub struct RedisQueue {
    connection: MultiplexedConnection,
    input_list: String,
    output_list: String,
}

impl RedisQueue {
    /// Connects to the broker and checks it answers `PING`.
    pub async fn connect(settings: &QueueSettings) -> Result<Self, QueueError> {
        let connection_error = |e: RedisError| QueueError::Connection {
            url: settings.url.clone(),
            message: e.to_string(),
        };

        let client = ::redis::Client::open(settings.url.as_str()).map_err(connection_error)?;
        let mut connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(connection_error)?;

        let pong: String = ::redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(connection_error)?;
        info!(
            url = %settings.url,
            reply = %pong,
            input = %settings.input_list,
            output = %settings.output_list,
            "Connected to Redis"
        );

        Ok(Self {
            connection,
            input_list: settings.input_list.clone(),
            output_list: settings.output_list.clone(),
        })
    }

    pub fn input_list(&self) -> &str {
        &self.input_list
    }

    pub fn output_list(&self) -> &str {
        &self.output_list
    }
}

fn command_error(command: &'static str) -> impl Fn(RedisError) -> QueueError {
    move |e| QueueError::Command {
        command,
        message: e.to_string(),
    }
}

impl JobQueue for RedisQueue {
    async fn pop(&self, timeout: Duration) -> Result<Option<Vec<u8>>, QueueError> {
        let mut connection = self.connection.clone();
        let popped: Option<(String, Vec<u8>)> = connection
            .blpop(&self.input_list, timeout.as_secs_f64())
            .await
            .map_err(command_error("BLPOP"))?;

        if let Some((list, payload)) = &popped {
            debug!(list = %list, bytes = payload.len(), "Received job");
        }
        Ok(popped.map(|(_, payload)| payload))
    }

    async fn push_result(&self, payload: &str) -> Result<(), QueueError> {
        let mut connection = self.connection.clone();
        let length: i64 = connection
            .rpush(&self.output_list, payload)
            .await
            .map_err(command_error("RPUSH"))?;
        debug!(list = %self.output_list, length, "Pushed result");
        Ok(())
    }
}
