use anyhow::Result;
use chrono::Local;

use zavod_jobs::gemini::GeminiClient;
use zavod_jobs::supabase::SupabaseClient;
use zavod_jobs::{analyze, config, scrape, storage, upload};

fn main() -> Result<()> {
    // Missing configuration is the only fatal error in the pipeline.
    let env_config = config::EnvConfig::from_env()?;
    let root = config::root_dir();
    let settings = config::Settings::load(&root)?;
    let date = Local::now().format("%Y%m%d").to_string();

    println!("\n=== Starting scraper ===");
    let jobs = scrape::run(&settings);
    if jobs.is_empty() {
        println!("No job batches were created. Exiting.");
        return Ok(());
    }
    println!("Total jobs found: {}", jobs.len());
    let num_batches = storage::save_raw_batches(&root, &date, &jobs, settings.batch_size)?;

    println!("\n=== Starting analysis ===");
    let gemini = GeminiClient::new(env_config.gemini_api_key);
    analyze::run(&gemini, &root, &date, settings.chunk_size)?;

    let analyzed = storage::load_analyzed(&root, &date);
    if analyzed.is_empty() {
        println!("No analyzed jobs to upload. Exiting.");
        storage::cleanup_run_files(&root, &date, num_batches);
        return Ok(());
    }
    println!("Analysis completed successfully with {} jobs", analyzed.len());

    println!("\n=== Starting Supabase upload ===");
    let supabase = SupabaseClient::new(env_config.supabase_url, env_config.supabase_key);
    let summary = upload::upload_jobs(&supabase, &analyzed, &date);
    println!("\nUpload Summary:");
    println!("Total jobs processed: {}", summary.total);
    println!("Successfully uploaded: {}", summary.uploaded);
    println!("Failed uploads: {}", summary.failed);

    println!("\n=== Cleaning up files ===");
    storage::cleanup_run_files(&root, &date, num_batches);

    println!("\n=== All tasks completed successfully ===");
    Ok(())
}
