//! Channel layouts and reordering
//!
//! All containers are reconciled to one model: an 18-bit speaker mask in
//! Microsoft order, plus a [`ChannelReorderPlan`] saying where each channel in
//! the file lands in that canonical order, and what the channels outside the
//! mask are.

use crate::error::{Error, Result, Warning};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::warn;

bitflags! {
    /// The 18 canonical speaker positions (bit 0 = front left)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Speakers: u32 {
        const FRONT_LEFT = 1 << 0;
        const FRONT_RIGHT = 1 << 1;
        const FRONT_CENTER = 1 << 2;
        const LOW_FREQUENCY = 1 << 3;
        const BACK_LEFT = 1 << 4;
        const BACK_RIGHT = 1 << 5;
        const FRONT_LEFT_OF_CENTER = 1 << 6;
        const FRONT_RIGHT_OF_CENTER = 1 << 7;
        const BACK_CENTER = 1 << 8;
        const SIDE_LEFT = 1 << 9;
        const SIDE_RIGHT = 1 << 10;
        const TOP_CENTER = 1 << 11;
        const TOP_FRONT_LEFT = 1 << 12;
        const TOP_FRONT_CENTER = 1 << 13;
        const TOP_FRONT_RIGHT = 1 << 14;
        const TOP_BACK_LEFT = 1 << 15;
        const TOP_BACK_CENTER = 1 << 16;
        const TOP_BACK_RIGHT = 1 << 17;
    }
}

/// Number of canonical speakers
pub const NUM_SPEAKERS: u32 = 18;

/// Identity code for a channel with no known meaning
pub const NO_IDENTITY: u8 = 0xff;

/// Default mask for a channel count when the file says nothing
///
/// Mono is front center, stereo is front left + right, up to 18 channels take
/// the first N speakers and anything wider gets all 18.
pub fn default_mask(num_channels: u32) -> u32 {
    match num_channels {
        0 => 0,
        1 | 2 => 5 - num_channels,
        n if n <= NUM_SPEAKERS => (1 << n) - 1,
        _ => Speakers::all().bits(),
    }
}

/// A vendor channel label, in CAF numbering
///
/// 1..=18 are the canonical speakers. A few other ranges carry identities that
/// survive as codes outside the mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelLabel(pub u32);

impl ChannelLabel {
    pub const UNUSED: ChannelLabel = ChannelLabel(0);
    pub const USE_COORDINATES: ChannelLabel = ChannelLabel(100);
    pub const UNKNOWN: ChannelLabel = ChannelLabel(0xffff_ffff);

    /// Canonical speaker number (1..=18), if this is one
    pub fn speaker(&self) -> Option<u32> {
        (1..=NUM_SPEAKERS).contains(&self.0).then_some(self.0)
    }

    /// Identity code for a channel outside the mask
    ///
    /// Returns `None` for labels that carry no known identity.
    fn identity(&self) -> Option<u8> {
        match self.0 {
            0 | 100 | 0xffff_ffff => Some(NO_IDENTITY),
            l @ (33..=44 | 200..=207) => Some(l as u8),
            l @ 301..=305 => Some((l - 80) as u8),
            _ => None,
        }
    }

    /// Label for an identity code, the inverse of the resolver's mapping
    ///
    /// Codes without a label become [`ChannelLabel::UNUSED`].
    pub fn from_identity(identity: u8) -> ChannelLabel {
        match identity {
            i @ (1..=18 | 33..=44 | 200..=207) => ChannelLabel(i as u32),
            i @ 221..=225 => ChannelLabel(i as u32 + 80),
            _ => ChannelLabel::UNUSED,
        }
    }
}

/// Where each file channel lands in canonical order, and what the channels
/// beyond the speaker mask are
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelReorderPlan {
    /// `permutation[source_index] = canonical_slot`; `None` is the identity
    pub permutation: Option<Vec<u8>>,
    /// Identity codes for the channels after the mask, in canonical order
    pub unassigned_identities: Vec<u8>,
}

impl ChannelReorderPlan {
    /// Build a plan, dropping an identity permutation and trailing
    /// [`NO_IDENTITY`] codes
    pub fn new(permutation: Option<Vec<u8>>, mut unassigned_identities: Vec<u8>) -> Self {
        let permutation = permutation
            .filter(|p| p.iter().enumerate().any(|(i, &slot)| slot as usize != i));

        while unassigned_identities.last() == Some(&NO_IDENTITY) {
            unassigned_identities.pop();
        }

        ChannelReorderPlan {
            permutation,
            unassigned_identities,
        }
    }

    /// Plan with no reordering and no identities
    pub fn identity() -> Self {
        Self::default()
    }

    /// Plan from a reorder string of arbitrary base (e.g. 1-based "3124")
    ///
    /// Values are shifted so the smallest becomes zero.
    pub fn from_order(order: &[u8], unassigned_identities: &[u8]) -> Self {
        let base = order.iter().copied().min().unwrap_or(0);
        let permutation = order.iter().map(|&v| v - base).collect::<Vec<_>>();
        Self::new(
            (!permutation.is_empty()).then_some(permutation),
            unassigned_identities.to_vec(),
        )
    }

    /// True when file order differs from canonical order
    pub fn is_reordered(&self) -> bool {
        self.permutation.is_some()
    }

    /// True when the permutation (if any) is a bijection on `0..num_channels`
    pub fn is_bijection(&self, num_channels: usize) -> bool {
        match &self.permutation {
            None => true,
            Some(perm) => {
                if perm.len() != num_channels {
                    return false;
                }
                let mut seen = vec![false; num_channels];
                perm.iter().all(|&slot| {
                    let slot = slot as usize;
                    slot < num_channels && !std::mem::replace(&mut seen[slot], true)
                })
            }
        }
    }

    /// One identity per channel in canonical order
    ///
    /// Mask bits yield speaker numbers 1..=18; the rest come from
    /// `unassigned_identities`, padded with [`NO_IDENTITY`].
    pub fn channel_identities(&self, channel_mask: u32, num_channels: usize) -> Vec<u8> {
        let mut identities = (0..NUM_SPEAKERS)
            .filter(|bit| channel_mask & (1 << bit) != 0)
            .map(|bit| (bit + 1) as u8)
            .take(num_channels)
            .collect::<Vec<_>>();

        let mut extra = self.unassigned_identities.iter().copied();
        while identities.len() < num_channels {
            identities.push(extra.next().unwrap_or(NO_IDENTITY));
        }

        identities
    }

    /// One identity per channel in file order
    pub fn file_order_identities(&self, channel_mask: u32, num_channels: usize) -> Vec<u8> {
        let canonical = self.channel_identities(channel_mask, num_channels);
        match &self.permutation {
            Some(perm) => perm
                .iter()
                .map(|&slot| canonical.get(slot as usize).copied().unwrap_or(NO_IDENTITY))
                .collect(),
            None => canonical,
        }
    }
}

/// Resolve vendor labels (in file order) into a mask and reorder plan
pub fn resolve(raw_labels: &[ChannelLabel]) -> Result<(u32, ChannelReorderPlan)> {
    let mut warnings = Vec::new();
    let resolved = resolve_with_warnings(raw_labels, &mut warnings)?;
    for warning in &warnings {
        warn!("{}", warning);
    }
    Ok(resolved)
}

/// Like [`resolve`], collecting warnings instead of logging them
///
/// Speaker labels are taken in canonical order, each claiming the next
/// slot; every other channel follows in file order. A speaker label used
/// twice is an error.
pub fn resolve_with_warnings(
    raw_labels: &[ChannelLabel],
    warnings: &mut Vec<Warning>,
) -> Result<(u32, ChannelReorderPlan)> {
    if raw_labels.len() > 256 {
        return Err(Error::invalid_input(format!(
            "{} channels is more than a layout can describe",
            raw_labels.len()
        )));
    }

    let mut slots: Vec<Option<u8>> = vec![None; raw_labels.len()];
    let mut next_slot = 0usize;
    let mut mask = 0u32;

    for speaker in 1..=NUM_SPEAKERS {
        let mut matches = raw_labels
            .iter()
            .enumerate()
            .filter(|(_, label)| label.speaker() == Some(speaker))
            .map(|(i, _)| i);

        if let Some(first) = matches.next() {
            if matches.next().is_some() {
                return Err(Error::DuplicateChannel { label: speaker });
            }
            mask |= 1 << (speaker - 1);
            slots[first] = Some(next_slot as u8);
            next_slot += 1;
        }
    }

    let mut identities = Vec::new();
    for (i, label) in raw_labels.iter().enumerate() {
        if slots[i].is_some() {
            continue;
        }
        let identity = label.identity().unwrap_or_else(|| {
            warnings.push(Warning::UnknownChannelLabel { label: label.0 });
            NO_IDENTITY
        });
        identities.push(identity);
        slots[i] = Some(next_slot as u8);
        next_slot += 1;
    }

    let permutation = slots.into_iter().flatten().collect::<Vec<_>>();
    let permutation = (!permutation.is_empty()).then_some(permutation);

    Ok((mask, ChannelReorderPlan::new(permutation, identities)))
}
