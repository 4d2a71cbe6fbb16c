/// Track map visualization

use crate::format::constants::UNFORMATTED_BYTE;
use crate::image::{RecordingMode, VirtualDisk};

/// ANSI color codes for track map
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BRIGHT_WHITE: &str = "\x1b[97m";
    pub const DARK_WHITE: &str = "\x1b[37m";
    pub const BRIGHT_RED: &str = "\x1b[91m";
    pub const BRIGHT_YELLOW: &str = "\x1b[93m";
    pub const DARK_YELLOW: &str = "\x1b[2;33m";
}

const BLOCK_NO_DATA: &str = "\u{2591}"; // ░ - Light shade (blank)
const BLOCK_HAS_DATA: &str = "\u{2593}"; // ▓ - Dark shade (in-use)

/// State of one IDAM slot, as drawn on the map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Data field still holds the format filler
    Blank(RecordingMode),
    /// Data field has been written
    InUse(RecordingMode),
    /// ID field present but data unreadable
    Error,
}

/// Classify every populated IDAM slot of one track, in physical order
///
/// Each slot is read from the track at (cyl, head) itself, whatever C/H/R
/// its ID field records.
pub fn track_slots(disk: &VirtualDisk, cyl: usize, head: usize) -> Vec<SlotState> {
    let mut buf = [0u8; 1024];
    disk.sector_ids(cyl, head)
        .into_iter()
        .enumerate()
        .map(|(slot, id)| match disk.fetch_slot(cyl, head, slot, &mut buf) {
            Ok(n) if buf[..n].iter().all(|&b| b == UNFORMATTED_BYTE) => SlotState::Blank(id.mode),
            Ok(_) => SlotState::InUse(id.mode),
            Err(_) => SlotState::Error,
        })
        .collect()
}

/// Draw a visual track map for one head
///
/// Columns are cylinders and rows are IDAM slots, slot 0 at the bottom.
pub fn draw_track_map(disk: &VirtualDisk, head: usize) {
    if head >= disk.num_heads() {
        println!("Head {} not found.", head);
        return;
    }

    let num_cylinders = disk.num_cylinders();
    let columns: Vec<Vec<SlotState>> = (0..num_cylinders)
        .map(|cyl| track_slots(disk, cyl, head))
        .collect();
    let max_slots = columns.iter().map(|c| c.len()).max().unwrap_or(0);
    if max_slots == 0 {
        println!("No sectors found on head {}.", head);
        return;
    }

    println!("=== Track Map (Head {}) ===", head);
    println!(
        "Legend: {}MFM{} {}FM{} {}Error{}",
        colors::BRIGHT_WHITE,
        colors::RESET,
        colors::BRIGHT_YELLOW,
        colors::RESET,
        colors::BRIGHT_RED,
        colors::RESET
    );
    println!();

    for slot in (0..max_slots).rev() {
        print!("{:>2} ", slot);
        for column in &columns {
            let (color, block) = match column.get(slot) {
                None => {
                    print!(" ");
                    continue;
                }
                Some(SlotState::InUse(RecordingMode::MFM)) => (colors::BRIGHT_WHITE, BLOCK_HAS_DATA),
                Some(SlotState::Blank(RecordingMode::MFM)) => (colors::DARK_WHITE, BLOCK_NO_DATA),
                Some(SlotState::InUse(RecordingMode::FM)) => (colors::BRIGHT_YELLOW, BLOCK_HAS_DATA),
                Some(SlotState::Blank(RecordingMode::FM)) => (colors::DARK_YELLOW, BLOCK_NO_DATA),
                Some(SlotState::Error) => (colors::BRIGHT_RED, BLOCK_HAS_DATA),
            };
            print!("{}{}{}", color, block, colors::RESET);
        }
        println!();
    }

    // Cylinder axis, a label every five columns
    print!("   ");
    let mut printed_cols = vec![false; num_cylinders];
    for cyl in 0..num_cylinders {
        if cyl % 5 == 0 && !printed_cols[cyl] {
            for (i, digit) in cyl.to_string().chars().enumerate() {
                let col = cyl + i;
                if col < num_cylinders {
                    print!("{}", digit);
                    printed_cols[col] = true;
                }
            }
        } else if !printed_cols[cyl] {
            print!(" ");
        }
    }
    println!();
}
