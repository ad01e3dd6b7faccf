use chrono::Utc;
use patron_db::{SampleCustomerDataset, SeedResult};

use crate::commands::{prepare, CommandResult, Failure, Store};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let store = Store::open(&config).await?;

        let outcome = seed_and_verify(&store).await;
        store.close().await;
        outcome
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", summary(&seeded)),
        Err(failure) => CommandResult::from_failure("seed", failure),
    }
}

async fn seed_and_verify(store: &Store) -> Result<SeedResult, Failure> {
    let seeded = SampleCustomerDataset::load(store.repository.as_ref(), Utc::now())
        .await
        .map_err(|error| ("seed_execution", error.to_string(), 6u8))?;

    let missing = SampleCustomerDataset::missing(store.repository.as_ref())
        .await
        .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;
    if !missing.is_empty() {
        return Err(("seed_verification", verification_message(&missing), 6u8));
    }

    Ok(seeded)
}

fn verification_message(missing: &[&str]) -> String {
    format!("sample customers missing after seeding: {}", missing.join(", "))
}

fn summary(seeded: &SeedResult) -> String {
    let total = seeded.inserted.len() + seeded.skipped.len();
    format!(
        "sample customers ready ({total} total): {} inserted, {} already present",
        seeded.inserted.len(),
        seeded.skipped.len()
    )
}

#[cfg(test)]
mod tests {
    use patron_db::SeedResult;

    use super::{summary, verification_message};

    #[test]
    fn summary_counts_inserted_and_skipped() {
        let seeded = SeedResult {
            inserted: vec!["123.456.789-01".to_string()],
            skipped: vec!["000.000.000-00".to_string(), "12345678900".to_string()],
        };

        assert_eq!(
            summary(&seeded),
            "sample customers ready (3 total): 1 inserted, 2 already present"
        );
    }

    #[test]
    fn verification_message_lists_missing_cpfs() {
        assert_eq!(
            verification_message(&["111", "222"]),
            "sample customers missing after seeding: 111, 222"
        );
    }
}
