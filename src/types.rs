use serde::{Deserialize, Serialize};

/// One job posting as captured from the portal, before normalization.
///
/// Optional sections default to empty; a record with only a title and the
/// list-view previews is still a valid record.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawJob {
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub application_method: String,
    #[serde(default)]
    pub contact_info: String,
    #[serde(default)]
    pub job_url: String,
    #[serde(default)]
    pub posted_date: String,
    #[serde(default)]
    pub scraped_at: String,
}

impl RawJob {
    /// Field names and rendered values, in a stable order, for the
    /// key: value text blocks sent to the text-generation service.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("title", self.title.clone()),
            ("company", self.company.clone()),
            ("location", self.location.clone()),
            ("description", self.description.clone()),
            ("requirements", self.requirements.join("; ")),
            ("benefits", self.benefits.join("; ")),
            ("application_method", self.application_method.clone()),
            ("contact_info", self.contact_info.clone()),
            ("job_url", self.job_url.clone()),
            ("posted_date", self.posted_date.clone()),
            ("scraped_at", self.scraped_at.clone()),
        ]
    }
}
