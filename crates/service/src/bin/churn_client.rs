//! Post a customer record to a running prediction service.

use anyhow::{Context, Result};
use churn_core::RiskTier;
use clap::Parser;
use serde_json::{json, Value};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "churn-client")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Send a customer record to the churn prediction service", long_about = None)]
struct Args {
    /// Prediction endpoint
    #[arg(short, long, default_value = "http://localhost:9696/predict")]
    url: String,

    /// JSON record file; a sample customer is sent when omitted
    #[arg(short, long)]
    record: Option<PathBuf>,

    /// Target name used in the response body
    #[arg(long, default_value = "churn")]
    target: String,
}

fn sample_customer() -> Value {
    json!({
        "gender": "female",
        "seniorcitizen": 0,
        "partner": "yes",
        "dependents": "no",
        "phoneservice": "no",
        "multiplelines": "no_phone_service",
        "internetservice": "dsl",
        "onlinesecurity": "no",
        "onlinebackup": "yes",
        "deviceprotection": "no",
        "techsupport": "no",
        "streamingtv": "no",
        "streamingmovies": "no",
        "contract": "month-to-month",
        "paperlessbilling": "yes",
        "paymentmethod": "electronic_check",
        "tenure": 1,
        "monthlycharges": 29.85,
        "totalcharges": 29.85
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let record = match &args.record {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&raw).context("Record is not valid JSON")?
        }
        None => sample_customer(),
    };

    let response = reqwest::Client::new()
        .post(&args.url)
        .json(&record)
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", args.url))?;

    let status = response.status();
    let body = response.text().await.context("Failed to read response body")?;
    if !status.is_success() {
        anyhow::bail!("service answered {status}: {body}");
    }

    let result: Value = serde_json::from_str(&body).context("Response is not valid JSON")?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    let probability = result
        .get(format!("{}_probability", args.target))
        .and_then(Value::as_f64);
    let decision = result.get(&args.target).and_then(Value::as_bool);

    if let (Some(probability), Some(decision)) = (probability, decision) {
        let tier = RiskTier::from_probability(probability);
        println!("probability: {probability:.3}");
        println!("decision:    {decision}");
        println!("risk:        {tier}");
        println!("action:      {}", tier.recommended_action());
    }

    Ok(())
}
