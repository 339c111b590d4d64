//! LLM normalization stage.
//!
//! Raw jobs are cleaned, chunked and sent to the text-generation service
//! together with a fixed standardization prompt. A chunk whose response does
//! not parse as a JSON array is retried one job at a time; a job whose
//! individual request also fails is dropped. The returned objects are never
//! validated against the target schema, the upload stage reads them
//! permissively.

use anyhow::{bail, Context, Result};
use serde_json::Value;

use crate::storage;
use crate::types::RawJob;

/// Sampling knobs forwarded to the text-generation service.
#[derive(Debug, Clone, Copy)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
}

/// Seam for the text-generation service so the stage can run against a
/// scripted fake in tests.
pub trait TextGenerator {
    fn generate(&self, prompt: &str, config: Option<&GenerationConfig>) -> Result<String>;
}

/// Low-temperature sampling for the chunk requests. The one-by-one fallback
/// sends no sampling config at all.
const CHUNK_SAMPLING: GenerationConfig = GenerationConfig {
    temperature: 0.1,
    top_p: 0.8,
    top_k: 40,
};

const STANDARDIZATION_PROMPT: &str = r#"Reformat these job listings into the following schema. Return ONLY valid JSON with no explanations:

[
  {
    "job_id": "unique identifier or empty string",
    "title": "job title",
    "company": "company name",
    "location": "city/location",
    "posted_date": "2025-04-04",
    "application_deadline": "YYYY-MM-DD or null",
    "job_url": "full URL",
    "work_mode": "On-site/Remote/Hybrid",
    "compensation": {
      "salary_range": "",
      "benefits_package": ""
    },
    "company_info": {
      "size": "",
      "industry": "",
      "years_active": "",
      "business_scale": ""
    },
    "employment_type": "",
    "required_qualifications": [],
    "preferred_qualifications": [],
    "responsibilities": [],
    "benefits": [],
    "department_size": "",
    "key_skills": [],
    "languages": [],
    "application_method": ""
  }
]

IMPORTANT STANDARDIZATION RULES:

1. For "location", only use ONE of these standardized region names (match to the closest region):
Gorenjska, Goriška, Jugovzhodna Slovenija, Koroška, Notranjsko-kraška, Obalno-kraška, Osrednjeslovenska,
Podravska, Pomurska, Savinjska, Spodnjeposavska, Zasavska, Tujina, Remote

2. For "company_info.industry", only use ONE of these standardized industry categories:
Administracija
Arhitektura, Gradbeništvo, Geodezija
Bančništvo, Finance
Elektrotehnika, Elektronika, Telekomunikacije
Farmacija, Naravoslovje
Gostinstvo, Turizem
Informatika, Programiranje
Kadrovanje
Agronomija, Gozdarstvo, Ribištvo, Veterina
Komerciala, Trženje
Prehrambena industrija, Živilstvo
Proizvodnja, Steklarstvo
Lesarstvo
Računovodstvo, Revizija
Socialno in prostovoljno delo
Strojištvo, Metalurgija, Rudarstvo
Poučevanje, Prevajanje, Kultura, Šport
Tehnične storitve, Mehanika
Kreativa, Design
Management, Poslovno svetovanje, Organizacija
Marketing, Oglaševanje, PR
Novinarstvo, Mediji, Založništvo
Osebne storitve, Varovanje
Pravo, Družboslovje
Transport, Nabava, Logistika
Trgovina
Zavarovalništvo, Nepremičnine
Zdravstvo, Nega
Znanost, Tehnologija, Raziskave in razvoj
Drugo

RETURN ONLY THE JSON ARRAY. No markdown formatting."#;

/// Processes every raw batch file for the run date and writes the analyzed
/// file when anything came back. Returns the collected records.
pub fn run(client: &dyn TextGenerator, root: &str, date: &str, chunk_size: usize) -> Result<Vec<Value>> {
    let mut all_analyzed = Vec::new();
    let mut batch_number = 1;

    loop {
        let jobs = match storage::load_raw_batch(root, date, batch_number)? {
            Some(jobs) => jobs,
            None => break,
        };
        println!("\nProcessing batch {}", batch_number);
        all_analyzed.extend(normalize_jobs(client, &jobs, chunk_size));
        batch_number += 1;
    }

    if !all_analyzed.is_empty() {
        storage::save_analyzed(root, date, &all_analyzed)?;
        println!("Total jobs analyzed: {}", all_analyzed.len());
    }
    Ok(all_analyzed)
}

/// Normalizes a batch of raw jobs, chunk by chunk. Chunking partitions the
/// input; records are only lost downstream, when their individual fallback
/// request fails to parse.
pub fn normalize_jobs(client: &dyn TextGenerator, jobs: &[RawJob], chunk_size: usize) -> Vec<Value> {
    let cleaned: Vec<RawJob> = jobs.iter().map(clean_job).collect();
    let mut normalized = Vec::new();

    for chunk in cleaned.chunks(chunk_size.max(1)) {
        match normalize_chunk(client, chunk) {
            Ok(mut records) => {
                println!("Successfully processed {} jobs", records.len());
                normalized.append(&mut records);
            }
            Err(e) => {
                eprintln!("Error with chunk ({:#}), trying one-by-one processing", e);
                normalized.extend(normalize_one_by_one(client, chunk));
            }
        }
    }
    normalized
}

fn normalize_chunk(client: &dyn TextGenerator, chunk: &[RawJob]) -> Result<Vec<Value>> {
    let prompt = format!("{}{}", STANDARDIZATION_PROMPT, render_chunk(chunk));
    let response = client.generate(&prompt, Some(&CHUNK_SAMPLING))?;
    let text = strip_code_fences(&response);
    let records: Vec<Value> =
        serde_json::from_str(text).context("Response is not a valid JSON array")?;
    Ok(records)
}

fn normalize_one_by_one(client: &dyn TextGenerator, chunk: &[RawJob]) -> Vec<Value> {
    let mut records = Vec::new();
    for job in chunk {
        match normalize_single(client, job) {
            Ok(record) => records.push(record),
            Err(e) => eprintln!("Failed to process individual job '{}': {:#}", job.title, e),
        }
    }
    records
}

fn normalize_single(client: &dyn TextGenerator, job: &RawJob) -> Result<Value> {
    let prompt = format!(
        "{}\n\nJOB TO PROCESS:\n\n{}",
        STANDARDIZATION_PROMPT,
        render_job(job)
    );
    let response = client.generate(&prompt, None)?;
    let text = strip_code_fences(&response);
    let value: Value = serde_json::from_str(text).context("Response is not valid JSON")?;

    // A single job may come back wrapped in a one-element array.
    match value {
        Value::Array(mut items) => {
            if items.is_empty() {
                bail!("response array is empty");
            }
            Ok(items.remove(0))
        }
        other => Ok(other),
    }
}

fn render_chunk(chunk: &[RawJob]) -> String {
    let mut out = String::from("\n\nJOB LISTINGS TO PROCESS:\n\n");
    for (index, job) in chunk.iter().enumerate() {
        out.push_str(&format!("JOB {}:\n", index + 1));
        out.push_str(&render_job(job));
        out.push_str("\n\n---\n\n");
    }
    out
}

fn render_job(job: &RawJob) -> String {
    job.fields()
        .iter()
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Best-effort extraction of the JSON payload from a response that may or
/// may not honor the "no markdown" instruction: a ```json fence first, then
/// a bare ``` fence, else the text as-is.
pub fn strip_code_fences(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        let rest = &text[start + 7..];
        let inner = match rest.find("```") {
            Some(end) => &rest[..end],
            None => rest,
        };
        return inner.trim();
    }
    if let Some(start) = text.find("```") {
        let rest = &text[start + 3..];
        let inner = match rest.find("```") {
            Some(end) => &rest[..end],
            None => rest,
        };
        return inner.trim();
    }
    text.trim()
}

/// Strips control characters (code points below 32) while preserving all
/// other characters, so the key: value blocks stay single-line per field.
fn clean_text(text: &str) -> String {
    text.chars().filter(|c| (*c as u32) >= 32).collect()
}

fn clean_job(job: &RawJob) -> RawJob {
    RawJob {
        title: clean_text(&job.title),
        company: clean_text(&job.company),
        location: clean_text(&job.location),
        description: clean_text(&job.description),
        requirements: job.requirements.iter().map(|s| clean_text(s)).collect(),
        benefits: job.benefits.iter().map(|s| clean_text(s)).collect(),
        application_method: clean_text(&job.application_method),
        contact_info: clean_text(&job.contact_info),
        job_url: clean_text(&job.job_url),
        posted_date: clean_text(&job.posted_date),
        scraped_at: clean_text(&job.scraped_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        let text = "```json\n[{\"title\": \"a\"}]\n```";
        assert_eq!(strip_code_fences(text), "[{\"title\": \"a\"}]");
    }

    #[test]
    fn strips_bare_fence() {
        let text = "```\n[1, 2]\n```";
        assert_eq!(strip_code_fences(text), "[1, 2]");
    }

    #[test]
    fn leaves_plain_text_alone() {
        assert_eq!(strip_code_fences("  [1]  "), "[1]");
    }

    #[test]
    fn handles_unterminated_fence() {
        assert_eq!(strip_code_fences("```json\n[true]"), "[true]");
    }

    #[test]
    fn fence_with_leading_prose_is_still_found() {
        let text = "Here you go:\n```json\n{}\n```\nanything else";
        assert_eq!(strip_code_fences(text), "{}");
    }

    #[test]
    fn clean_text_drops_control_characters_only() {
        assert_eq!(clean_text("a\nb\tc"), "abc");
        assert_eq!(clean_text("Plača: 1.500 €"), "Plača: 1.500 €");
    }

    #[test]
    fn rendered_chunk_numbers_jobs_and_lists_fields() {
        let jobs = vec![
            RawJob {
                title: "Voznik".to_string(),
                company: "Prevozi d.o.o.".to_string(),
                ..Default::default()
            },
            RawJob {
                title: "Kuhar".to_string(),
                company: "Gostilna".to_string(),
                ..Default::default()
            },
        ];
        let text = render_chunk(&jobs);
        assert!(text.contains("JOB LISTINGS TO PROCESS"));
        assert!(text.contains("JOB 1:"));
        assert!(text.contains("JOB 2:"));
        assert!(text.contains("title: Voznik"));
        assert!(text.contains("company: Gostilna"));
    }

    #[test]
    fn prompt_carries_both_closed_enumerations() {
        assert!(STANDARDIZATION_PROMPT.contains("Osrednjeslovenska"));
        assert!(STANDARDIZATION_PROMPT.contains("Informatika, Programiranje"));
        assert!(STANDARDIZATION_PROMPT.contains("RETURN ONLY THE JSON ARRAY"));
    }
}
