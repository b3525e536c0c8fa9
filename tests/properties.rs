use proptest::prelude::*;
use spymaster::{
    admit, AgentMessage, DigestAttestor, MessagesRuntime, SequencedMessage, SpyMasterContract,
    SpyMasterProgram, SpyMessage,
};

fn valid_message() -> impl Strategy<Value = SpyMessage> {
    (1u64..=3000, 0u64..=15000, 5000u64..=20000)
        .prop_map(|(a, x, y)| SpyMessage::with_checksum(a, x, y).unwrap())
}

fn any_message() -> impl Strategy<Value = SpyMessage> {
    (0u64..5000, 0u64..30000, 0u64..30000, 0u64..60000).prop_map(|(a, x, y, c)| SpyMessage {
        agent_id: a,
        x_location: x,
        y_location: y,
        checksum: c,
    })
}

proptest! {
    #[test]
    fn increasing_valid_batch_folds_to_last_number(
        messages in prop::collection::vec(valid_message(), 1..40),
        start in 0u64..1000,
    ) {
        let program = SpyMasterProgram::new(DigestAttestor::default());
        let batch: Vec<SequencedMessage> = messages
            .into_iter()
            .enumerate()
            .map(|(i, message)| SequencedMessage { message_number: start + i as u64, message })
            .collect();
        let proof = program.fold_batch(0, &batch).unwrap();
        prop_assert_eq!(proof.public_output, batch.last().unwrap().message_number);
    }

    #[test]
    fn reserved_agent_is_always_accepted(
        message in any_message(),
        number in 0u64..10_000,
        prior in 0u64..10_000,
    ) {
        let message = SpyMessage { agent_id: 0, ..message };
        let decision = admit(&SequencedMessage { message_number: number, message }, prior);
        prop_assert!(decision.accepted());
        prop_assert_eq!(decision.result, number.max(prior));
    }

    #[test]
    fn running_number_never_regresses(
        stream in prop::collection::vec((0u64..200, any_message()), 0..60),
    ) {
        let program = SpyMasterProgram::new(DigestAttestor::default());
        let mut proof = program.init(0).unwrap();
        for (number, message) in stream {
            let next = program.process_message(number, &proof, &message).unwrap();
            prop_assert!(next.public_output >= proof.public_output);
            if number <= proof.public_output {
                prop_assert_eq!(next.public_output, proof.public_output);
            }
            proof = next;
        }
    }

    #[test]
    fn non_improving_commit_is_idempotent(
        committed in 1u64..500,
        numbers in prop::collection::vec(0u64..500, 0..20),
    ) {
        let program = SpyMasterProgram::new(DigestAttestor::default());
        let mut contract = SpyMasterContract::new();
        let first = program
            .fold_batch(0, &[SequencedMessage {
                message_number: committed,
                message: SpyMessage::with_checksum(0, 0, 0).unwrap(),
            }])
            .unwrap();
        contract.process_batch(&first, program.attestor()).unwrap();
        let batch: Vec<SequencedMessage> = numbers
            .into_iter()
            .filter(|n| *n <= committed)
            .map(|n| SequencedMessage {
                message_number: n,
                message: SpyMessage::with_checksum(1, 1, 5000).unwrap(),
            })
            .collect();
        let before = contract;
        let proof = program.fold_batch(0, &batch).unwrap();
        contract.process_batch(&proof, program.attestor()).unwrap();
        prop_assert_eq!(contract, before);
    }

    #[test]
    fn stale_numbers_fail_without_side_effects(
        accepted in 1u64..1000,
        offset in 0u64..1000,
    ) {
        let mut runtime = MessagesRuntime::new();
        runtime.init_agent(7, 42).unwrap();
        let message = AgentMessage {
            agent_id: 7,
            message_number: accepted,
            twelve_char: 555_555_555_555,
            security_code: 42,
        };
        runtime.process_message(&message).unwrap();
        let stale = AgentMessage {
            message_number: accepted.saturating_sub(offset),
            ..message
        };
        prop_assert!(runtime.process_message(&stale).is_err());
        prop_assert_eq!(runtime.registry().get(7).unwrap().message_number, accepted);
    }
}
