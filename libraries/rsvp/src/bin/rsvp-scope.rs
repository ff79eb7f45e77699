use std::collections::BTreeMap;
use std::path::PathBuf;

use rsvp::data_model::key;
use rsvp::store::parse_snapshot;

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: {} <path-to-rsvp-snapshot>", args[0]);
        eprintln!("\nExample: {} ./ankit_rsvps.json", args[0]);
        std::process::exit(1);
    }

    let file_path = PathBuf::from(&args[1]);

    if !file_path.exists() {
        eprintln!("Error: File '{}' does not exist", file_path.display());
        std::process::exit(1);
    }

    let bytes = match std::fs::read(&file_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", file_path.display(), e);
            std::process::exit(1);
        }
    };

    println!("RsvpScope - RSVP Snapshot Analyzer");
    println!("==================================");
    println!("File: {}", file_path.display());
    println!("Size: {} bytes", bytes.len());
    println!();

    if bytes.is_empty() {
        println!("  Empty snapshot (no RSVPs saved yet)");
        return;
    }

    let records = match parse_snapshot(&bytes) {
        Ok(records) => records,
        Err(e) => {
            println!("  ❌ ERROR: {e}");
            std::process::exit(1);
        }
    };

    println!("Records:");
    println!("--------");
    if records.is_empty() {
        println!("  No records found");
    }

    let mut tally: BTreeMap<String, usize> = BTreeMap::new();
    let mut mismatched = Vec::new();

    for (stored_key, record) in &records {
        println!("  Key: {stored_key}");
        println!("    Name: {}", record.name);
        if let Some(phone) = &record.phone {
            println!("    Phone: {phone}");
        }
        if let Some(email) = &record.email {
            println!("    Email: {email}");
        }
        if let Some(party_size) = &record.party_size {
            println!("    Party size: {party_size}");
        }
        println!("    Attending: {}", record.attendance);

        *tally.entry(record.attendance.to_string()).or_default() += 1;

        match key::resolve(record) {
            Ok(derived) if &derived == stored_key => {}
            Ok(derived) => {
                println!("    ⚠️  Stored under `{stored_key}` but its fields resolve to `{derived}`");
                mismatched.push(stored_key.clone());
            }
            Err(e) => {
                println!("    ⚠️  {e}");
                mismatched.push(stored_key.clone());
            }
        }
    }

    println!();
    println!("Summary:");
    println!("--------");
    println!("  Total RSVPs: {}", records.len());
    for (attendance, count) in &tally {
        println!("    {attendance}: {count}");
    }

    if mismatched.is_empty() {
        println!("  ✅ Every record is stored under the key its fields resolve to");
    } else {
        println!(
            "  ⚠️  {} record(s) stored under an unexpected key",
            mismatched.len()
        );
    }
}
