//! Shared test doubles for the status source and notifier seams.

use std::{
    collections::HashMap,
    sync::Mutex,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::status::StatusSource;
use crate::telegram::Notifier;

/// Scripted status source: each application number maps to a fixed reply.
#[derive(Default)]
pub struct FakeStatusSource {
    statuses: Mutex<HashMap<String, String>>,
    cities: Mutex<HashMap<String, u32>>,
    pub fail_status: Mutex<bool>,
    pub fail_cities: Mutex<bool>,
}

impl FakeStatusSource {
    pub fn with_status(self, number: &str, status: &str) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .insert(number.to_string(), status.to_string());
        self
    }

    pub fn with_city(self, name: &str, id: u32) -> Self {
        self.cities
            .lock()
            .unwrap()
            .insert(name.to_lowercase(), id);
        self
    }

    pub fn set_status(&self, number: &str, status: &str) {
        self.statuses
            .lock()
            .unwrap()
            .insert(number.to_string(), status.to_string());
    }

    pub fn set_failing(&self, failing: bool) {
        *self.fail_status.lock().unwrap() = failing;
    }
}

#[async_trait]
impl StatusSource for FakeStatusSource {
    async fn lookup_status(&self, application_number: &str) -> Result<String> {
        if *self.fail_status.lock().unwrap() {
            return Err(anyhow!("status source unavailable"));
        }
        self.statuses
            .lock()
            .unwrap()
            .get(application_number)
            .cloned()
            .ok_or_else(|| anyhow!("no scripted status for {application_number}"))
    }

    async fn lookup_status_in_city(
        &self,
        application_number: &str,
        _city_id: u32,
    ) -> Result<String> {
        self.lookup_status(application_number).await
    }

    async fn lookup_city_id(&self, city_name: &str) -> Result<Option<u32>> {
        if *self.fail_cities.lock().unwrap() {
            return Err(anyhow!("city list unavailable"));
        }
        Ok(self
            .cities
            .lock()
            .unwrap()
            .get(&city_name.to_lowercase())
            .copied())
    }
}

/// Records every outbound message instead of talking to Telegram.
#[derive(Default)]
pub struct RecordingNotifier {
    pub texts: Mutex<Vec<(i64, String)>>,
    pub choices: Mutex<Vec<(i64, String, Vec<(String, String)>)>>,
    pub fail_sends: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn sent_texts(&self) -> Vec<(i64, String)> {
        self.texts.lock().unwrap().clone()
    }

    pub fn sent_choices(&self) -> Vec<(i64, String, Vec<(String, String)>)> {
        self.choices.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        if *self.fail_sends.lock().unwrap() {
            return Err(anyhow!("send failed"));
        }
        self.texts
            .lock()
            .unwrap()
            .push((chat_id, text.to_string()));
        Ok(())
    }

    async fn send_choice(
        &self,
        chat_id: i64,
        text: &str,
        choices: &[(String, String)],
    ) -> Result<()> {
        if *self.fail_sends.lock().unwrap() {
            return Err(anyhow!("send failed"));
        }
        self.choices
            .lock()
            .unwrap()
            .push((chat_id, text.to_string(), choices.to_vec()));
        Ok(())
    }
}
