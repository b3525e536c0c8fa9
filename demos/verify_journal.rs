use spymaster::journal::verify_journal;
use std::path::PathBuf;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let path = args
        .get(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("spymaster_journal").join("agents.log"));
    println!("Verifying journal {}", path.display());
    match verify_journal(&path) {
        Ok(receipts) => {
            for receipt in &receipts {
                match &receipt.failure {
                    None => println!(
                        "[ok]   agent {} message {}",
                        receipt.agent_id, receipt.message_number
                    ),
                    Some(reason) => println!(
                        "[fail] agent {} message {} -> {reason}",
                        receipt.agent_id, receipt.message_number
                    ),
                }
            }
            println!("{} records, chain intact.", receipts.len());
        }
        Err(err) => {
            eprintln!("[fail] {} -> {err}", path.display());
            std::process::exit(1);
        }
    }
}
