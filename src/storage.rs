//! Intermediate files at the stage boundaries.
//!
//! Raw batches and the analyzed file are UTF-8 pretty JSON arrays whose
//! names carry the run date, so a rerun on the same day picks up where the
//! previous stage left off. All of them are removed by the end-of-run
//! cleanup.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::types::RawJob;

pub fn raw_batch_path(root: &str, date: &str, batch: usize) -> PathBuf {
    PathBuf::from(root).join(format!("jobs_raw_{}_batch{}.json", date, batch))
}

pub fn analyzed_path(root: &str, date: &str) -> PathBuf {
    PathBuf::from(root).join(format!("jobs_analyzed_{}.json", date))
}

/// Splits the scraped jobs into numbered batch files. Returns the number of
/// batches written.
pub fn save_raw_batches(root: &str, date: &str, jobs: &[RawJob], batch_size: usize) -> Result<usize> {
    let mut batch_number = 0;
    for chunk in jobs.chunks(batch_size.max(1)) {
        batch_number += 1;
        let path = raw_batch_path(root, date, batch_number);
        let json = serde_json::to_string_pretty(chunk)?;
        fs::write(&path, json).with_context(|| format!("Failed to write batch to {:?}", path))?;
        println!("Saved batch {} with {} jobs to {:?}", batch_number, chunk.len(), path);
    }
    Ok(batch_number)
}

/// Loads one raw batch file; None when the file does not exist, which ends
/// the batch iteration in the analysis stage.
pub fn load_raw_batch(root: &str, date: &str, batch: usize) -> Result<Option<Vec<RawJob>>> {
    let path = raw_batch_path(root, date, batch);
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read batch from {:?}", path))?;
    let jobs: Vec<RawJob> =
        serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {:?}", path))?;
    Ok(Some(jobs))
}

pub fn save_analyzed(root: &str, date: &str, jobs: &[Value]) -> Result<()> {
    let path = analyzed_path(root, date);
    let json = serde_json::to_string_pretty(jobs)?;
    fs::write(&path, json).with_context(|| format!("Failed to write analyzed jobs to {:?}", path))?;
    println!("All analyzed jobs saved to: {:?}", path);
    Ok(())
}

/// Loads the analyzed file for the upload stage. A missing file or a file
/// that is not a JSON array degrades to an empty list, not an error.
pub fn load_analyzed(root: &str, date: &str) -> Vec<Value> {
    let path = analyzed_path(root, date);
    if !path.exists() {
        return vec![];
    }

    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading jobs file {:?}: {}", path, e);
            return vec![];
        }
    };

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Array(jobs)) => jobs,
        Ok(_) | Err(_) => {
            eprintln!("Error reading jobs file, starting with empty list");
            vec![]
        }
    }
}

/// Deletes the run's batch files and the analyzed file. Failures are logged
/// and do not stop the remaining deletions.
pub fn cleanup_run_files(root: &str, date: &str, num_batches: usize) {
    let mut paths: Vec<PathBuf> = (1..=num_batches)
        .map(|n| raw_batch_path(root, date, n))
        .collect();
    paths.push(analyzed_path(root, date));

    for path in paths {
        match fs::remove_file(&path) {
            Ok(()) => println!("Deleted: {:?}", path),
            Err(e) => eprintln!("Error deleting {:?}: {}", path, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_root(name: &str) -> String {
        let dir = std::env::temp_dir().join(format!("zavod_jobs_{}_{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir.to_string_lossy().to_string()
    }

    fn job(title: &str) -> RawJob {
        RawJob {
            title: title.to_string(),
            company: "Acme".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn batch_files_round_trip() {
        let root = test_root("roundtrip");
        let jobs: Vec<RawJob> = (0..5).map(|i| job(&format!("Job {}", i))).collect();

        let batches = save_raw_batches(&root, "20250101", &jobs, 2).unwrap();
        assert_eq!(batches, 3);

        let first = load_raw_batch(&root, "20250101", 1).unwrap().unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].title, "Job 0");
        let last = load_raw_batch(&root, "20250101", 3).unwrap().unwrap();
        assert_eq!(last.len(), 1);
        assert!(load_raw_batch(&root, "20250101", 4).unwrap().is_none());

        cleanup_run_files(&root, "20250101", batches);
        assert!(load_raw_batch(&root, "20250101", 1).unwrap().is_none());
    }

    #[test]
    fn analyzed_file_round_trip_and_cleanup() {
        let root = test_root("analyzed");
        let jobs = vec![json!({"title": "Engineer"})];

        save_analyzed(&root, "20250102", &jobs).unwrap();
        let loaded = load_analyzed(&root, "20250102");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0]["title"], "Engineer");

        cleanup_run_files(&root, "20250102", 0);
        assert!(load_analyzed(&root, "20250102").is_empty());
    }

    #[test]
    fn missing_or_invalid_analyzed_file_yields_empty_list() {
        let root = test_root("invalid");
        assert!(load_analyzed(&root, "20250103").is_empty());

        fs::write(analyzed_path(&root, "20250103"), "not json").unwrap();
        assert!(load_analyzed(&root, "20250103").is_empty());

        fs::write(analyzed_path(&root, "20250103"), "{\"not\": \"an array\"}").unwrap();
        assert!(load_analyzed(&root, "20250103").is_empty());

        cleanup_run_files(&root, "20250103", 0);
    }
}
