//! Named Core Audio channel layouts
//!
//! Each entry gives the speakers a layout covers as a Microsoft mask, the
//! 1-based canonical position of each file channel when the layout is not in
//! Microsoft order, and the identity codes of any channels outside the mask.

use crate::format::channels::{default_mask, ChannelReorderPlan, NO_IDENTITY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutEntry {
    /// Layout number in the high word, channel count in the low word
    pub tag: u32,
    pub mask: u32,
    pub reorder: Option<&'static [u8]>,
    pub identities: Option<&'static [u8]>,
}

impl LayoutEntry {
    pub fn num_channels(&self) -> u32 {
        self.tag & 0xffff
    }

    /// Reorder plan this layout implies
    pub fn plan(&self) -> ChannelReorderPlan {
        let identities = self.identities.unwrap_or(&[]);
        match self.reorder {
            Some(order) => ChannelReorderPlan::from_order(order, identities),
            None => ChannelReorderPlan::new(None, identities.to_vec()),
        }
    }

    pub fn describes(&self, num_channels: u32, mask: u32, plan: &ChannelReorderPlan) -> bool {
        self.num_channels() == num_channels && self.mask == mask && self.plan() == *plan
    }
}

const fn entry(
    layout: u32,
    channels: u32,
    mask: u32,
    reorder: Option<&'static [u8]>,
    identities: Option<&'static [u8]>,
) -> LayoutEntry {
    LayoutEntry {
        tag: (layout << 16) | channels,
        mask,
        reorder,
        identities,
    }
}

const TMH_STD: &[u8] = &[1, 2, 3, 11, 8, 9, 5, 6, 10, 12, 13, 14, 15, 7, 4, 16];
const TMH_FULL: &[u8] = &[
    1, 2, 3, 13, 10, 11, 5, 6, 12, 14, 15, 16, 17, 9, 4, 18, 7, 8, 19, 20, 21,
];

const LT_RT: &[u8] = &[38, 39];
const RLS_RRS: &[u8] = &[33, 34];
const TMH_EXTRA: &[u8] = &[35, 36, 44, 37];

pub static LAYOUTS: [LayoutEntry; 47] = [
    entry(100, 1, 0x004, None, None),
    entry(101, 2, 0x003, None, None),
    entry(102, 2, 0x003, None, None),
    entry(103, 2, 0x000, None, Some(LT_RT)),
    entry(104, 2, 0x000, None, Some(&[204, 205])),
    entry(105, 2, 0x000, None, Some(&[206, 207])),
    entry(106, 2, 0x003, None, None),
    entry(107, 4, 0x000, None, Some(&[200, 201, 202, 203])),
    entry(108, 4, 0x033, None, None),
    entry(109, 5, 0x037, Some(&[1, 2, 4, 5, 3]), None),
    entry(110, 6, 0x137, Some(&[1, 2, 4, 5, 3, 6]), None),
    entry(111, 8, 0x737, Some(&[1, 2, 4, 5, 3, 6, 7, 8]), None),
    entry(112, 8, 0x2d033, None, None),
    entry(113, 3, 0x007, None, None),
    entry(114, 3, 0x007, Some(&[3, 1, 2]), None),
    entry(115, 4, 0x107, None, None),
    entry(116, 4, 0x107, Some(&[3, 1, 2, 4]), None),
    entry(117, 5, 0x037, None, None),
    entry(118, 5, 0x037, Some(&[1, 2, 4, 5, 3]), None),
    entry(119, 5, 0x037, Some(&[1, 3, 2, 4, 5]), None),
    entry(120, 5, 0x037, Some(&[3, 1, 2, 4, 5]), None),
    entry(121, 6, 0x03f, None, None),
    entry(122, 6, 0x03f, Some(&[1, 2, 5, 6, 3, 4]), None),
    entry(123, 6, 0x03f, Some(&[1, 3, 2, 5, 6, 4]), None),
    entry(124, 6, 0x03f, Some(&[3, 1, 2, 5, 6, 4]), None),
    entry(125, 7, 0x13f, None, None),
    entry(126, 8, 0x0ff, None, None),
    entry(127, 8, 0x0ff, Some(&[3, 7, 8, 1, 2, 5, 6, 4]), None),
    entry(128, 8, 0x03f, None, Some(RLS_RRS)),
    entry(129, 8, 0x0ff, Some(&[1, 2, 5, 6, 3, 4, 7, 8]), None),
    entry(130, 8, 0x03f, None, Some(LT_RT)),
    entry(131, 3, 0x103, None, None),
    entry(132, 4, 0x033, None, None),
    entry(133, 3, 0x00b, None, None),
    entry(134, 4, 0x10b, None, None),
    entry(135, 5, 0x03b, None, None),
    entry(136, 4, 0x00f, None, None),
    entry(137, 5, 0x10f, None, None),
    entry(138, 5, 0x03b, Some(&[1, 2, 4, 5, 3]), None),
    entry(139, 6, 0x137, Some(&[1, 2, 4, 5, 3, 6]), None),
    entry(140, 7, 0x037, Some(&[1, 2, 4, 5, 3, 6, 7]), Some(RLS_RRS)),
    entry(141, 6, 0x137, Some(&[3, 1, 2, 4, 5, 6]), None),
    entry(142, 7, 0x13f, Some(&[3, 1, 2, 5, 6, 7, 4]), None),
    entry(143, 7, 0x037, Some(&[3, 1, 2, 4, 5, 6, 7]), Some(RLS_RRS)),
    entry(144, 8, 0x137, Some(&[3, 1, 2, 4, 5, 7, 8, 6]), Some(RLS_RRS)),
    entry(145, 16, 0x773f, Some(TMH_STD), Some(TMH_EXTRA)),
    entry(146, 21, 0x77ff, Some(TMH_FULL), Some(TMH_EXTRA)),
];

/// Table entry for a layout tag
pub fn lookup(tag: u32) -> Option<&'static LayoutEntry> {
    LAYOUTS.iter().find(|entry| entry.tag == tag)
}

/// First table entry describing exactly this channel arrangement
pub fn find(
    num_channels: u32,
    mask: u32,
    plan: &ChannelReorderPlan,
) -> Option<&'static LayoutEntry> {
    LAYOUTS
        .iter()
        .find(|entry| entry.describes(num_channels, mask, plan))
}

/// Whether a file without a `chan` chunk would read back differently
pub fn needs_chan(num_channels: u32, mask: u32, plan: &ChannelReorderPlan) -> bool {
    if plan.is_reordered() {
        return true;
    }
    if num_channels > 2 {
        plan.channel_identities(mask, num_channels as usize)
            .iter()
            .any(|&id| id != NO_IDENTITY)
    } else {
        mask != default_mask(num_channels) || !plan.unassigned_identities.is_empty()
    }
}

/// Tag written for this arrangement when no other tag is asked for
pub fn derived_tag(num_channels: u32, mask: u32, plan: &ChannelReorderPlan) -> Option<u32> {
    if !needs_chan(num_channels, mask, plan) {
        return None;
    }
    find(num_channels, mask, plan).map(|entry| entry.tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_entry_is_consistent() {
        for entry in LAYOUTS.iter() {
            let n = entry.num_channels() as usize;
            let plan = entry.plan();
            assert!(plan.is_bijection(n), "tag {:08x}", entry.tag);
            let assigned = entry.mask.count_ones() as usize + entry.identities.map_or(0, |i| i.len());
            assert!(assigned <= n, "tag {:08x}", entry.tag);
            if let Some(order) = entry.reorder {
                assert_eq!(order.len(), n, "tag {:08x}", entry.tag);
            }
        }
    }

    #[test]
    fn test_lookup() {
        let entry = lookup((114 << 16) | 3).unwrap();
        assert_eq!(entry.mask, 0x7);
        assert_eq!(entry.plan().permutation, Some(vec![2, 0, 1]));
        assert!(lookup((147 << 16) | 2).is_none());
    }

    #[test]
    fn test_find_first_match() {
        let quad = find(4, 0x33, &ChannelReorderPlan::identity()).unwrap();
        assert_eq!(quad.tag, (108 << 16) | 4);

        let stereo = find(2, 0x3, &ChannelReorderPlan::identity()).unwrap();
        assert_eq!(stereo.tag, (101 << 16) | 2);

        assert!(find(2, 0x3, &ChannelReorderPlan::new(Some(vec![1, 0]), vec![])).is_none());
    }

    #[test]
    fn test_derived_tag() {
        let identity = ChannelReorderPlan::identity();
        assert_eq!(derived_tag(2, 0x3, &identity), None);
        assert_eq!(derived_tag(4, 0x33, &identity), Some((108 << 16) | 4));
        assert_eq!(derived_tag(3, 0x206, &identity), None);
        assert!(needs_chan(3, 0x206, &identity));
        assert!(!needs_chan(4, 0, &identity));

        let headphones = lookup((102 << 16) | 2).unwrap();
        assert!(headphones.describes(2, 0x3, &identity));
        assert!(!headphones.describes(2, 0x3, &ChannelReorderPlan::new(Some(vec![1, 0]), vec![])));
    }

    #[test]
    fn test_find_with_identities() {
        let lt_rt = ChannelReorderPlan::new(None, vec![38, 39]);
        assert_eq!(find(2, 0, &lt_rt).unwrap().tag, (103 << 16) | 2);
        assert_eq!(find(8, 0x3f, &lt_rt).unwrap().tag, (130 << 16) | 8);
    }
}
