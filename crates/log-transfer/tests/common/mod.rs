// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use log_transfer::{SendError, Sender};
use std::sync::{Arc, Mutex};

/// Sender that keeps every batch it receives.
#[derive(Clone, Default)]
pub struct RecordingSender {
    batches: Arc<Mutex<Vec<Vec<String>>>>,
}

#[allow(dead_code)]
impl RecordingSender {
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().expect("lock poisoned").clone()
    }

    pub fn lines(&self) -> Vec<serde_json::Value> {
        self.batches()
            .into_iter()
            .flatten()
            .map(|line| serde_json::from_str(&line).expect("line is not JSON"))
            .collect()
    }
}

#[async_trait]
impl Sender for RecordingSender {
    async fn send(&self, lines: &[String]) -> Result<(), SendError> {
        self.batches
            .lock()
            .expect("lock poisoned")
            .push(lines.to_vec());
        Ok(())
    }
}
