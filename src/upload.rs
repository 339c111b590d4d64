//! Maps normalized records onto the jobs table shape and inserts them one by
//! one. Row construction is total: any input, however incomplete, yields a
//! row with a non-empty id and title.

use anyhow::Result;
use serde_json::{json, Map, Value};

pub const JOBS_TABLE: &str = "jobs";

/// Seam for the hosted table so the stage can run against a recording fake
/// in tests.
pub trait TableClient {
    fn insert(&self, table: &str, row: &Value) -> Result<()>;
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub total: usize,
    pub uploaded: usize,
    pub failed: usize,
}

/// Uploads each record in index order. A failed insert is logged and counted
/// and does not affect sibling rows.
pub fn upload_jobs(client: &dyn TableClient, jobs: &[Value], date: &str) -> UploadSummary {
    let mut summary = UploadSummary {
        total: jobs.len(),
        ..Default::default()
    };

    for (index, job) in jobs.iter().enumerate() {
        let row = format_job_for_upload(job, index, date);
        let id = row["id"].as_str().unwrap_or_default().to_string();
        let title = row["title"].as_str().unwrap_or_default().to_string();

        match client.insert(JOBS_TABLE, &row) {
            Ok(()) => {
                summary.uploaded += 1;
                println!("Uploaded job {}/{}: {} - {}", index + 1, summary.total, id, title);
            }
            Err(e) => {
                summary.failed += 1;
                eprintln!("Failed to upload job {}/{}: {:#}", index + 1, summary.total, e);
            }
        }
    }
    summary
}

/// Builds the target row from a normalized record, reading known keys with
/// type coercion and literal fallbacks. The identifier is
/// `zavod_<date>_<1-based index>`.
pub fn format_job_for_upload(job: &Value, index: usize, date: &str) -> Value {
    let id = format!("zavod_{}_{}", date, index + 1);

    let posted_date = {
        let value = safe_str(job.get("posted_date"));
        if value.is_empty() {
            date.to_string()
        } else {
            value
        }
    };
    let application_deadline = match job.get("application_deadline") {
        Some(Value::String(s)) if !s.trim().is_empty() => Value::String(s.trim().to_string()),
        _ => Value::Null,
    };

    json!({
        "id": id,
        "title": or_literal(safe_str(job.get("title")), "Untitled Position"),
        "company": or_literal(safe_str(job.get("company")), "Unknown Company"),
        "location": or_literal(safe_str(job.get("location")), "Slovenia"),
        "town_location": safe_str(job.get("town_location")),
        "posted_date": posted_date,
        "application_deadline": application_deadline,
        "job_url": safe_str(job.get("job_url")),
        "work_mode": or_literal(safe_str(job.get("work_mode")), "Not specified"),
        "industry": safe_str(job.get("industry")),

        // JSONB columns with guaranteed structure
        "compensation": safe_obj(job.get("compensation")),
        "company_info": safe_obj(job.get("company_info")),

        "employment_type": safe_str(job.get("employment_type")),
        "department_size": safe_str(job.get("department_size")),
        "application_method": safe_str(job.get("application_method")),

        "required_qualifications": safe_list(job.get("required_qualifications")),
        "preferred_qualifications": safe_list(job.get("preferred_qualifications")),
        "responsibilities": safe_list(job.get("responsibilities")),
        "benefits": safe_list(job.get("benefits")),
        "key_skills": safe_list(job.get("key_skills")),
        "languages": safe_list(job.get("languages")),
    })
}

/// Coerces any scalar to a trimmed string; missing, null and structured
/// values become the empty string.
fn safe_str(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn or_literal(value: String, literal: &str) -> String {
    if value.is_empty() {
        literal.to_string()
    } else {
        value
    }
}

/// Coerces to a list of strings, dropping nulls and stringifying anything
/// that is not already a string. Missing or non-array values become `[]`.
fn safe_list(value: Option<&Value>) -> Value {
    match value {
        Some(Value::Array(items)) => Value::Array(
            items
                .iter()
                .filter(|item| !item.is_null())
                .map(|item| match item {
                    Value::String(s) => Value::String(s.clone()),
                    other => Value::String(other.to_string()),
                })
                .collect(),
        ),
        _ => Value::Array(vec![]),
    }
}

/// Coerces to an object; missing or non-object values become `{}`.
fn safe_obj(value: Option<&Value>) -> Value {
    match value {
        Some(Value::Object(map)) => Value::Object(map.clone()),
        _ => Value::Object(Map::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_record_still_yields_id_and_fallback_literals() {
        let row = format_job_for_upload(&json!({}), 0, "20250404");
        assert_eq!(row["id"], "zavod_20250404_1");
        assert_eq!(row["title"], "Untitled Position");
        assert_eq!(row["company"], "Unknown Company");
        assert_eq!(row["location"], "Slovenia");
        assert_eq!(row["work_mode"], "Not specified");
        assert_eq!(row["town_location"], "");
        assert_eq!(row["posted_date"], "20250404");
        assert_eq!(row["application_deadline"], Value::Null);
        assert_eq!(row["compensation"], json!({}));
        assert_eq!(row["required_qualifications"], json!([]));
    }

    #[test]
    fn identifiers_follow_the_input_index() {
        for index in [0usize, 1, 9] {
            let row = format_job_for_upload(&json!({}), index, "20250404");
            assert_eq!(
                row["id"],
                format!("zavod_20250404_{}", index + 1).as_str()
            );
        }
    }

    #[test]
    fn null_title_falls_back_while_other_fields_pass_through() {
        let record = json!({
            "title": null,
            "company": "Acme",
            "location": "  Osrednjeslovenska  ",
            "application_deadline": "2025-05-01",
        });
        let row = format_job_for_upload(&record, 0, "20250404");
        assert_eq!(row["title"], "Untitled Position");
        assert_eq!(row["company"], "Acme");
        assert_eq!(row["location"], "Osrednjeslovenska");
        assert_eq!(row["application_deadline"], "2025-05-01");
    }

    #[test]
    fn lists_are_coerced_and_nulls_dropped() {
        let record = json!({
            "key_skills": ["vožnja", 3, null, true],
            "benefits": "not a list",
        });
        let row = format_job_for_upload(&record, 0, "20250404");
        assert_eq!(row["key_skills"], json!(["vožnja", "3", "true"]));
        assert_eq!(row["benefits"], json!([]));
    }

    #[test]
    fn non_string_deadline_becomes_null() {
        let row = format_job_for_upload(&json!({"application_deadline": 20250501}), 0, "20250404");
        assert_eq!(row["application_deadline"], Value::Null);
        let row = format_job_for_upload(&json!({"application_deadline": "  "}), 0, "20250404");
        assert_eq!(row["application_deadline"], Value::Null);
    }

    #[test]
    fn formatting_is_idempotent() {
        let record = json!({"title": "Engineer", "company": "Acme"});
        let first = format_job_for_upload(&record, 2, "20250404");
        let second = format_job_for_upload(&record, 2, "20250404");
        assert_eq!(first, second);
    }
}
