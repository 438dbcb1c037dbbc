use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub job_no: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_creator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engineers: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extra: IndexMap<String, String>,
}

impl Task {
    pub fn new(job_no: impl Into<String>) -> Self {
        Self {
            job_no: job_no.into(),
            ..Self::default()
        }
    }

    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut task = Task::default();
        for (name, value) in pairs {
            let value = value.trim().to_string();
            match name.trim() {
                "job_no" => task.job_no = value,
                "job_creator" => task.job_creator = Some(value),
                "engineers" => task.engineers = Some(value),
                other => {
                    task.extra.insert(other.to_string(), value);
                }
            }
        }
        task
    }

    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        match name {
            "job_no" => self.job_no = value,
            "job_creator" => self.job_creator = Some(value),
            "engineers" => self.engineers = Some(value),
            other => {
                self.extra.insert(other.to_string(), value);
            }
        }
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "job_no" => Some(&self.job_no),
            "job_creator" => self.job_creator.as_deref(),
            "engineers" => self.engineers.as_deref(),
            other => self.extra.get(other).map(String::as_str),
        }
    }
}
