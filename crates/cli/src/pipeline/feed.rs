//! Synthetic frame feed for the demo run.
//!
//! Produces sync-word envelopes for every configured channel and splits
//! each one into two fragments so the engine has to reassemble them.

use bytes::{BufMut, Bytes, BytesMut};
use contracts::{ContractError, SourceChannel, TypeTag};
use frame_parser::SyncWordClassifier;

/// Data frame type in the standard handler set
const DATA_FRAME: TypeTag = TypeTag(0);

/// Configuration frame (v2) type in the standard handler set
const CONFIGURATION_FRAME: TypeTag = TypeTag(3);

/// Nominal grid frequency reported by the synthetic devices
const NOMINAL_FREQUENCY: f64 = 60.0;

/// Round-robin generator of synthetic device frames
#[derive(Debug)]
pub struct DemoFeed {
    channels: Vec<(SourceChannel, u16)>,
    sequence: u64,
    data_frames: u64,
}

impl DemoFeed {
    /// Pair each channel with a device id code
    ///
    /// Without configured channels one `demo:<id>` channel is created per id
    /// code; without id codes the channels are numbered from 1.
    pub fn new(channels: &[String], id_codes: &[u16]) -> Self {
        let channels = if channels.is_empty() {
            let ids: Vec<u16> = if id_codes.is_empty() {
                vec![1]
            } else {
                id_codes.to_vec()
            };
            ids.into_iter()
                .map(|id| (SourceChannel::from(format!("demo:{id}")), id))
                .collect()
        } else {
            channels
                .iter()
                .enumerate()
                .map(|(index, name)| {
                    let id = id_codes
                        .get(index % id_codes.len().max(1))
                        .copied()
                        .unwrap_or(index as u16 + 1);
                    (SourceChannel::new(name), id)
                })
                .collect()
        };

        Self {
            channels,
            sequence: 0,
            data_frames: 0,
        }
    }

    pub fn channels(&self) -> &[(SourceChannel, u16)] {
        &self.channels
    }

    /// Data frames produced so far
    pub fn data_frames(&self) -> u64 {
        self.data_frames
    }

    /// One configuration frame per channel, sent before any data
    pub fn configuration_frames(&self) -> Result<Vec<(SourceChannel, Bytes)>, ContractError> {
        self.channels
            .iter()
            .map(|(channel, id)| {
                let body = format!("station={channel};id={id};rate=30");
                let frame = SyncWordClassifier::encode(CONFIGURATION_FRAME, *id, body.as_bytes())?;
                Ok((channel.clone(), frame))
            })
            .collect()
    }

    /// Next data frame for every channel
    pub fn next_round(&mut self) -> Result<Vec<(SourceChannel, Bytes)>, ContractError> {
        self.sequence += 1;
        let deviation = (self.sequence % 20) as f64 * 0.001;

        let mut frames = Vec::with_capacity(self.channels.len());
        for (channel, id) in &self.channels {
            let mut body = BytesMut::with_capacity(16);
            body.put_u64(self.sequence);
            body.put_f64(NOMINAL_FREQUENCY + deviation);
            frames.push((
                channel.clone(),
                SyncWordClassifier::encode(DATA_FRAME, *id, &body)?,
            ));
        }

        self.data_frames += frames.len() as u64;
        Ok(frames)
    }

    /// Split a frame into two fragments at a point that moves every round
    pub fn fragments(&self, frame: &Bytes) -> [Bytes; 2] {
        if frame.len() < 2 {
            return [frame.clone(), Bytes::new()];
        }
        let split = 1 + (self.sequence as usize % (frame.len() - 1));
        [frame.slice(..split), frame.slice(split..)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_channels_follow_id_codes() {
        let feed = DemoFeed::new(&[], &[4, 7]);
        let names: Vec<&str> = feed.channels().iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(names, vec!["demo:4", "demo:7"]);
    }

    #[test]
    fn test_configured_channels_cycle_id_codes() {
        let channels = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let feed = DemoFeed::new(&channels, &[9]);
        assert!(feed.channels().iter().all(|(_, id)| *id == 9));

        let feed = DemoFeed::new(&channels, &[]);
        let ids: Vec<u16> = feed.channels().iter().map(|(_, id)| *id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_fragments_rejoin_to_frame() {
        let mut feed = DemoFeed::new(&[], &[1]);
        for _ in 0..5 {
            let frames = feed.next_round().unwrap();
            let (_, frame) = &frames[0];
            let [head, tail] = feed.fragments(frame);
            assert!(!head.is_empty());
            assert_eq!([head, tail].concat(), frame.to_vec());
        }
        assert_eq!(feed.data_frames(), 5);
    }
}
