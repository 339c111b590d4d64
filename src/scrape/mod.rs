//! Browser-driven scrape stage: expand the results list, then walk every
//! card through its detail view.
//!
//! The session is async because thirtyfour is, but it runs to completion on
//! its own runtime before the next stage starts, so the pipeline stays
//! strictly sequential.

mod detail;
mod lister;

use std::time::Duration;

use anyhow::{Context, Result};
use thirtyfour::prelude::*;

use crate::config::Settings;
use crate::types::RawJob;

const PAGE_LOAD_TIMEOUT_SECS: u64 = 300;
const IMPLICIT_WAIT_SECS: u64 = 2;

/// Runs the scrape stage with a fixed number of whole-attempt retries.
/// Exhausted retries degrade to an empty job list so the downstream stages
/// can exit cleanly.
pub fn run(settings: &Settings) -> Vec<RawJob> {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start the scrape runtime: {}", e);
            return vec![];
        }
    };

    let attempts = settings.scrape_attempts.max(1);
    for attempt in 1..=attempts {
        match runtime.block_on(scrape_once(settings)) {
            Ok(jobs) => return jobs,
            Err(e) => {
                eprintln!("Scrape attempt {}/{} failed: {:#}", attempt, attempts, e);
                if attempt < attempts {
                    std::thread::sleep(Duration::from_secs(settings.retry_delay_secs));
                }
            }
        }
    }

    eprintln!("All scrape attempts failed, continuing with no jobs");
    vec![]
}

async fn scrape_once(settings: &Settings) -> Result<Vec<RawJob>> {
    let mut caps = DesiredCapabilities::chrome();
    let mut args = vec![
        "--no-sandbox",
        "--disable-dev-shm-usage",
        "--disable-gpu",
        "--window-size=1920,1080",
        "--disable-blink-features=AutomationControlled",
    ];
    if settings.headless {
        args.insert(0, "--headless=new");
    }
    caps.add_chrome_option("args", args)?;

    let driver = WebDriver::new(&settings.webdriver_url, caps)
        .await
        .context("Failed to connect to ChromeDriver")?;

    let result = async {
        driver
            .set_page_load_timeout(Duration::from_secs(PAGE_LOAD_TIMEOUT_SECS))
            .await?;
        driver
            .set_implicit_wait_timeout(Duration::from_secs(IMPLICIT_WAIT_SECS))
            .await?;

        let loaded = lister::load_result_cards(&driver, settings.job_limit).await?;
        if loaded == 0 {
            println!("No job cards loaded, nothing to scrape");
            return Ok(Vec::new());
        }

        Ok(detail::extract_jobs(&driver, loaded).await)
    }
    .await;

    if let Err(e) = driver.quit().await {
        eprintln!("Warning: Failed to quit browser: {}", e);
    }

    result
}
