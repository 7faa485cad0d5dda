//! Batch assembly.
//!
//! The client always reads `batch_size` frames per batch, so every payload is padded to
//! that many frames with all-zero no-op frames. Order is slot order on the device.

use crate::error::{Error, Result};
use crate::frame::{Command, Frame, empty_frame};
use crate::params::SessionParams;
use bytes::{Bytes, BytesMut};

/// Encodes `commands` in order and pads the result to a full batch.
///
/// Every command is encoded before anything is returned, so a parameter that does not fit
/// the session's integer width rejects the whole batch.
pub fn assemble(commands: &[Command], params: &SessionParams) -> Result<Bytes> {
    check_batch_len(commands.len(), params)?;

    let frames = commands
        .iter()
        .enumerate()
        .map(|(slot, command)| {
            if command.params().len() != params.param_count() {
                return Err(Error::contract(format!(
                    "command in slot {slot} has {} parameters, session expects {}",
                    command.params().len(),
                    params.param_count()
                )));
            }
            command.encode(params.int_width())
        })
        .collect::<Result<Vec<_>>>()?;

    pad_frames(frames, params)
}

/// Concatenates pre-built frames and fills the remaining slots with empty frames.
pub fn pad_frames(frames: Vec<Frame>, params: &SessionParams) -> Result<Bytes> {
    check_batch_len(frames.len(), params)?;

    let frame_len = params.bytes_per_command();
    if let Some(bad) = frames.iter().find(|f| f.len() != frame_len) {
        return Err(Error::contract(format!(
            "frame of {} bytes in a session of {frame_len}-byte frames",
            bad.len()
        )));
    }

    let padding = params.batch_size() - frames.len();
    let mut payload = BytesMut::with_capacity(params.payload_len());
    for frame in frames {
        payload.extend_from_slice(&frame);
    }
    let empty = empty_frame(frame_len);
    for _ in 0..padding {
        payload.extend_from_slice(&empty);
    }

    debug_assert_eq!(payload.len(), params.payload_len());
    Ok(payload.freeze())
}

fn check_batch_len(len: usize, params: &SessionParams) -> Result<()> {
    if len == 0 || len > params.batch_size() {
        return Err(Error::contract(format!(
            "number of commands must be between 1 and the batch size {}, got {len}",
            params.batch_size()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::setup_frame;

    fn cmd(op: u8, params: &[i64]) -> Command {
        Command::new(op, params.to_vec()).unwrap()
    }

    #[test]
    fn test_single_command_fills_batch_of_one() {
        let params = SessionParams::new(2, 6, 1).unwrap();
        let payload = assemble(&[cmd(55, &[12, 14, 14, 15, 16, 17])], &params).unwrap();
        assert_eq!(
            payload.as_ref(),
            &[55, 0, 12, 0, 14, 0, 14, 0, 15, 0, 16, 0, 17]
        );
    }

    #[test]
    fn test_partial_batch_is_zero_padded() {
        let params = SessionParams::new(1, 2, 4).unwrap();
        let payload = assemble(&[cmd(1, &[5, -1]), cmd(2, &[0, 127])], &params).unwrap();
        assert_eq!(
            payload.as_ref(),
            &[1, 5, 255, 2, 0, 127, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_batch_bounds() {
        let params = SessionParams::new(1, 0, 2).unwrap();
        assert!(matches!(assemble(&[], &params), Err(Error::Contract(_))));
        let three = vec![cmd(1, &[]), cmd(2, &[]), cmd(3, &[])];
        assert!(matches!(assemble(&three, &params), Err(Error::Contract(_))));
        assert_eq!(assemble(&three[..2], &params).unwrap().as_ref(), &[1, 2]);
    }

    #[test]
    fn test_param_count_mismatch() {
        let params = SessionParams::new(2, 3, 2).unwrap();
        let err = assemble(&[cmd(1, &[1, 2, 3]), cmd(2, &[1, 2])], &params).unwrap_err();
        assert!(matches!(err, Error::Contract(msg) if msg.contains("slot 1")));
    }

    #[test]
    fn test_range_error_aborts_batch() {
        let params = SessionParams::new(1, 1, 3).unwrap();
        let err = assemble(&[cmd(1, &[1]), cmd(2, &[300])], &params).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { value: 300, width: 1 }));
    }

    #[test]
    fn test_setup_frame_in_provisional_batch() {
        let params = SessionParams::new(2, 6, 20).unwrap();
        let frame = setup_frame(&params).unwrap();
        let payload = pad_frames(vec![frame], &SessionParams::PROVISIONAL).unwrap();
        assert_eq!(payload.as_ref(), &[0xFF, 2, 6, 20]);
    }

    #[test]
    fn test_pad_frames_rejects_wrong_frame_length() {
        let params = SessionParams::new(2, 1, 2).unwrap();
        assert!(matches!(
            pad_frames(vec![empty_frame(2)], &params),
            Err(Error::Contract(_))
        ));
    }
}
