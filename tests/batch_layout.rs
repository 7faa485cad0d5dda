//! Tests for wire payload layout

mod common;

use common::*;
use serial_master::batch::{assemble, pad_frames};
use serial_master::frame::{build_frame, empty_frame, setup_frame};

#[test]
fn test_sample_frame_bytes() {
    let params = SessionParams::new(2, 6, 1).unwrap();
    let payload = assemble(&[cmd(55, &SAMPLE_PARAMS)], &params).unwrap();
    assert_eq!(payload.as_ref(), hex_to_bytes(SAMPLE_FRAME_HEX).as_slice());
    assert_eq!(payload.len(), 13);
}

#[test]
fn test_payload_length_is_constant_for_every_fill_level() {
    for (int_width, param_count) in [(1usize, 0usize), (1, 3), (2, 6), (4, 2), (8, 1)] {
        for batch_size in 1..=6usize {
            let params = SessionParams::new(int_width, param_count, batch_size).unwrap();
            for k in 1..=batch_size {
                let commands: Vec<Command> = (0..k)
                    .map(|i| cmd(i as u8 + 1, &vec![i as i64 - 1; param_count]))
                    .collect();
                let payload = assemble(&commands, &params).unwrap();
                assert_eq!(payload.len(), batch_size * params.bytes_per_command());

                let frames: Vec<&[u8]> = payload.chunks(params.bytes_per_command()).collect();
                for (i, command) in commands.iter().enumerate() {
                    let expected = build_frame(command.operation_id(), command.params(), int_width).unwrap();
                    assert_eq!(frames[i], &expected[..], "slot {i} of {k}/{batch_size}");
                }
                for frame in &frames[k..] {
                    assert!(frame.iter().all(|&b| b == 0));
                }
            }
        }
    }
}

#[test]
fn test_empty_and_oversized_batches_are_contract_errors() {
    let params = SessionParams::new(2, 1, 3).unwrap();
    assert!(matches!(assemble(&[], &params), Err(Error::Contract(_))));
    let four = vec![cmd(1, &[0]); 4];
    assert!(matches!(assemble(&four, &params), Err(Error::Contract(_))));
}

#[test]
fn test_order_is_preserved() {
    let params = SessionParams::new(1, 1, 3).unwrap();
    let payload = assemble(&[cmd(3, &[30]), cmd(1, &[10]), cmd(2, &[20])], &params).unwrap();
    assert_eq!(payload.as_ref(), &[3, 30, 1, 10, 2, 20]);
}

#[test]
fn test_duplicate_commands_are_not_coalesced() {
    let params = SessionParams::new(2, 6, 20).unwrap();
    let batch = vec![cmd(55, &SAMPLE_PARAMS); 20];
    let payload = assemble(&batch, &params).unwrap();
    assert_eq!(payload.len(), 260);
    let frame = hex_to_bytes(SAMPLE_FRAME_HEX);
    assert!(payload.chunks(13).all(|chunk| chunk == frame.as_slice()));
}

#[test]
fn test_setup_payload() {
    let params = SessionParams::new(4, 3, 10).unwrap();
    let payload = pad_frames(vec![setup_frame(&params).unwrap()], &SessionParams::PROVISIONAL).unwrap();
    assert_eq!(payload.as_ref(), &[0xFF, 4, 3, 10]);
}

#[test]
fn test_empty_frame_matches_padding() {
    let params = SessionParams::new(2, 2, 2).unwrap();
    let payload = assemble(&[cmd(9, &[1, 2])], &params).unwrap();
    assert_eq!(&payload[5..], &empty_frame(5)[..]);
}
