//! Command-line front end for the spymaster admission layer.
//!
//! Folds location batches, commits them to a persisted contract, manages a
//! plain agent registry, and verifies audit journals.

use rand::Rng;
use spymaster::journal::{append_receipt, journal_head, verify_journal, JournalError};
use spymaster::{
    AgentMessage, AgentRegistry, CommitOutcome, DigestAttestor, GateConfig, MessagesRuntime,
    Receipt, SequencedMessage, SpyMasterContract, SpyMasterProgram, SpyMessage,
};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const JOURNAL_FILE: &str = "agents.log";

fn fatal(message: &str) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}

fn print_help() {
    println!("Usage: spymaster [--config <file>] <command> ...");
    println!("  fold <batch.json> [--seed <N>]");
    println!("  commit <contract.json> <batch.json> [--seed <N>]");
    println!("  agent <init|send|show> ...");
    println!("  journal verify <file>");
    println!("  demo-batch <count> [--start <N>]");
}

fn print_agent_help() {
    println!("Usage: spymaster agent <init|send|show> ...");
    println!("  init <registry.json> <agent_id> <security_code>");
    println!("  send <registry.json> <agent_id> <message_number> <twelve_char> <security_code>");
    println!("  show <registry.json>");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn parse_u64(value: &str, name: &str) -> u64 {
    value
        .parse()
        .unwrap_or_else(|_| fatal(&format!("invalid {name}: {value}")))
}

fn main() {
    init_tracing();
    let mut config_path: Option<PathBuf> = None;
    let mut rest = Vec::new();
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            let value = args
                .next()
                .unwrap_or_else(|| fatal("--config expects a value"));
            config_path = Some(PathBuf::from(value));
        } else {
            rest.push(arg);
        }
    }
    let config = GateConfig::resolve(config_path.as_deref())
        .unwrap_or_else(|err| fatal(&format!("config error: {err}")));
    debug!(?config, "configuration resolved");

    let mut rest = rest.into_iter();
    match rest.next().as_deref() {
        Some("fold") => cmd_fold(&config, rest.collect()),
        Some("commit") => cmd_commit(&config, rest.collect()),
        Some("agent") => {
            let sub = rest.next().unwrap_or_else(|| {
                print_agent_help();
                std::process::exit(1);
            });
            handle_agent(&config, &sub, rest.collect());
        }
        Some("journal") => match rest.next().as_deref() {
            Some("verify") => cmd_journal_verify(rest.collect()),
            _ => fatal("Usage: spymaster journal verify <file>"),
        },
        Some("demo-batch") => cmd_demo_batch(rest.collect()),
        Some("-h") | Some("--help") | None => print_help(),
        Some(other) => {
            eprintln!("Unknown command: {other}");
            print_help();
            std::process::exit(1);
        }
    }
}

fn handle_agent(config: &GateConfig, sub: &str, tail: Vec<String>) {
    match sub {
        "-h" | "--help" => print_agent_help(),
        "init" => cmd_agent_init(config, tail),
        "send" => cmd_agent_send(config, tail),
        "show" => cmd_agent_show(config, tail),
        _ => {
            eprintln!("Unknown agent subcommand: {sub}");
            std::process::exit(1);
        }
    }
}

fn read_batch(path: &Path) -> Vec<SequencedMessage> {
    let bytes = fs::read(path)
        .unwrap_or_else(|err| fatal(&format!("failed to read {}: {err}", path.display())));
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|err| fatal(&format!("invalid batch {}: {err}", path.display())))
}

fn program(config: &GateConfig, seed: u64) -> SpyMasterProgram<DigestAttestor> {
    let attestor = config
        .attestor()
        .unwrap_or_else(|err| fatal(&format!("config error: {err}")));
    SpyMasterProgram::new(attestor).with_seed(seed)
}

/// Splits `--seed <N>` from positional arguments; the seed defaults to the config.
fn seeded_args(config: &GateConfig, args: Vec<String>) -> (Vec<String>, u64) {
    let mut positional = Vec::new();
    let mut seed = config.fold_seed;
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        if arg == "--seed" {
            let value = iter
                .next()
                .unwrap_or_else(|| fatal("--seed expects a value"));
            seed = parse_u64(&value, "--seed value");
        } else {
            positional.push(arg);
        }
    }
    (positional, seed)
}

fn cmd_fold(config: &GateConfig, args: Vec<String>) {
    let (positional, seed) = seeded_args(config, args);
    if positional.len() != 1 {
        fatal("Usage: spymaster fold <batch.json> [--seed <N>]");
    }
    let batch = read_batch(Path::new(&positional[0]));
    let proof = program(config, seed)
        .fold_batch(seed, &batch)
        .unwrap_or_else(|err| fatal(&format!("fold failed: {err}")));
    match serde_json::to_string_pretty(&proof) {
        Ok(text) => println!("{text}"),
        Err(err) => fatal(&format!("failed to encode proof: {err}")),
    }
}

fn cmd_commit(config: &GateConfig, args: Vec<String>) {
    let (positional, seed) = seeded_args(config, args);
    if positional.len() != 2 {
        fatal("Usage: spymaster commit <contract.json> <batch.json> [--seed <N>]");
    }
    let contract_path = PathBuf::from(&positional[0]);
    let batch = read_batch(Path::new(&positional[1]));
    let program = program(config, seed);
    let proof = program
        .fold_batch(seed, &batch)
        .unwrap_or_else(|err| fatal(&format!("fold failed: {err}")));
    let mut contract = SpyMasterContract::load(&contract_path)
        .unwrap_or_else(|err| fatal(&format!("load contract: {err}")));
    match contract.process_batch(&proof, program.attestor()) {
        Ok(CommitOutcome::Advanced { from, to }) => {
            contract
                .save(&contract_path)
                .unwrap_or_else(|err| fatal(&format!("persist contract: {err}")));
            println!("committed: {from} -> {to} ({} messages)", proof.steps);
        }
        Ok(CommitOutcome::Unchanged { current }) => {
            println!(
                "unchanged: aggregate {} does not exceed {current}",
                proof.public_output
            );
        }
        Err(err) => fatal(&format!("commit rejected: {err}")),
    }
}

fn load_runtime(config: &GateConfig, path: &Path) -> MessagesRuntime {
    let registry = AgentRegistry::load(path, config.init_policy)
        .unwrap_or_else(|err| fatal(&format!("load registry: {err}")));
    MessagesRuntime::with_registry(registry)
}

fn save_runtime(runtime: MessagesRuntime, path: &Path) {
    runtime
        .into_registry()
        .save(path)
        .unwrap_or_else(|err| fatal(&format!("persist registry: {err}")));
}

fn record(config: &GateConfig, receipt: &Receipt) -> Result<(), JournalError> {
    match &config.journal_dir {
        Some(dir) => append_receipt(&dir.join(JOURNAL_FILE), receipt).map(|head| {
            debug!(%head, "journal record appended");
        }),
        None => Ok(()),
    }
}

fn cmd_agent_init(config: &GateConfig, args: Vec<String>) {
    if args.len() != 3 {
        fatal("Usage: spymaster agent init <registry.json> <agent_id> <security_code>");
    }
    let path = PathBuf::from(&args[0]);
    let agent_id = parse_u64(&args[1], "agent_id");
    let code = parse_u64(&args[2], "security_code");
    let mut runtime = load_runtime(config, &path);
    if let Err(err) = runtime.init_agent(agent_id, code) {
        fatal(&err.to_string());
    }
    save_runtime(runtime, &path);
    println!("agent {agent_id} initialized");
}

fn cmd_agent_send(config: &GateConfig, args: Vec<String>) {
    if args.len() != 5 {
        fatal(
            "Usage: spymaster agent send <registry.json> <agent_id> <message_number> <twelve_char> <security_code>",
        );
    }
    let path = PathBuf::from(&args[0]);
    let message = AgentMessage {
        agent_id: parse_u64(&args[1], "agent_id"),
        message_number: parse_u64(&args[2], "message_number"),
        twelve_char: parse_u64(&args[3], "twelve_char"),
        security_code: parse_u64(&args[4], "security_code"),
    };
    let mut runtime = load_runtime(config, &path);
    let result = runtime.process_message(&message);
    let receipt = Receipt::from_result(message.agent_id, message.message_number, &result);
    if let Err(err) = record(config, &receipt) {
        fatal(&format!("journal append failed, registry left unchanged: {err}"));
    }
    match result {
        Ok(()) => {
            save_runtime(runtime, &path);
            println!(
                "[ok]   agent {} message {}",
                message.agent_id, message.message_number
            );
        }
        Err(err) => fatal(&format!(
            "[fail] agent {} message {} -> {err}",
            message.agent_id, message.message_number
        )),
    }
}

fn cmd_agent_show(config: &GateConfig, args: Vec<String>) {
    let path = args
        .first()
        .map(PathBuf::from)
        .unwrap_or_else(|| fatal("Usage: spymaster agent show <registry.json>"));
    let runtime = load_runtime(config, &path);
    let registry = runtime.registry();
    if registry.is_empty() {
        println!("No agents registered.");
        return;
    }
    println!("{:>8} | {:>14}", "agent", "last message");
    println!("{}", "-".repeat(25));
    for (agent_id, state) in registry.iter() {
        println!("{:>8} | {:>14}", agent_id, state.message_number);
    }
}

fn cmd_journal_verify(args: Vec<String>) {
    let path = args
        .first()
        .map(PathBuf::from)
        .unwrap_or_else(|| fatal("Usage: spymaster journal verify <file>"));
    match verify_journal(&path).and_then(|receipts| Ok((receipts, journal_head(&path)?))) {
        Ok((receipts, head)) => {
            let failed = receipts.iter().filter(|r| r.failure.is_some()).count();
            println!(
                "[ok]   {} records ({} accepted, {failed} rejected), head {head}",
                receipts.len(),
                receipts.len() - failed
            );
        }
        Err(err) => fatal(&format!("[fail] {} -> {err}", path.display())),
    }
}

fn cmd_demo_batch(args: Vec<String>) {
    let mut count: Option<u64> = None;
    let mut start = 0u64;
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--start" => {
                let value = iter
                    .next()
                    .unwrap_or_else(|| fatal("--start expects a value"));
                start = parse_u64(&value, "--start value");
            }
            other if count.is_none() => count = Some(parse_u64(other, "count")),
            other => fatal(&format!("unknown argument: {other}")),
        }
    }
    let count = count.unwrap_or_else(|| fatal("Usage: spymaster demo-batch <count>"));
    let mut rng = rand::thread_rng();
    let batch: Vec<SequencedMessage> = (0..count)
        .filter_map(|i| {
            let message = SpyMessage::with_checksum(
                rng.gen_range(1..=3000),
                rng.gen_range(0..=15000),
                rng.gen_range(5000..=20000),
            )?;
            Some(SequencedMessage {
                message_number: start.checked_add(i)?,
                message,
            })
        })
        .collect();
    match serde_json::to_string_pretty(&batch) {
        Ok(text) => println!("{text}"),
        Err(err) => fatal(&format!("failed to encode batch: {err}")),
    }
}
