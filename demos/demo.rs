use spymaster::{
    CommitOutcome, DigestAttestor, SequencedMessage, SpyMasterContract, SpyMasterProgram, SpyMessage,
};

fn main() {
    let program = SpyMasterProgram::new(DigestAttestor::default());
    let reports = [(1, 10, 5000), (1500, 7500, 12000), (3000, 15000, 20000)];
    let batch: Vec<SequencedMessage> = reports
        .iter()
        .zip(0u64..)
        .filter_map(|(&(agent, x, y), number)| {
            Some(SequencedMessage {
                message_number: number,
                message: SpyMessage::with_checksum(agent, x, y)?,
            })
        })
        .collect();

    let proof = match program.fold_batch(0, &batch) {
        Ok(proof) => proof,
        Err(err) => {
            eprintln!("Fold failed: {err}");
            std::process::exit(1);
        }
    };
    println!(
        "Folded {} messages, highest accepted number {}.",
        proof.steps, proof.public_output
    );

    let mut contract = SpyMasterContract::new();
    match contract.process_batch(&proof, program.attestor()) {
        Ok(CommitOutcome::Advanced { from, to }) => println!("Committed {from} -> {to}."),
        Ok(CommitOutcome::Unchanged { current }) => {
            println!("Nothing to commit, still {current}.")
        }
        Err(err) => {
            eprintln!("Commit rejected: {err}");
            std::process::exit(1);
        }
    }
}
