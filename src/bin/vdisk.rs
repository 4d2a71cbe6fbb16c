/// Interactive virtual disk console application

use std::path::PathBuf;

use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use vdisk::*;

type Console = Editor<CommandCompleter, DefaultHistory>;

/// Command completer for the REPL
struct CommandCompleter {
    commands: Vec<&'static str>,
}

impl CommandCompleter {
    fn new() -> Self {
        Self {
            commands: vec![
                "create",
                "exit",
                "format-track",
                "help",
                "info",
                "load",
                "map",
                "open",
                "quit",
                "read-sector",
                "save",
                "sectors",
                "write-back",
                "write-protect",
                "write-sector",
            ],
        }
    }
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        // Only complete the first word (command name)
        let line_to_cursor = &line[..pos];
        if line_to_cursor.contains(' ') {
            return Ok((pos, vec![]));
        }

        let prefix = line_to_cursor.to_lowercase();
        let matches: Vec<Pair> = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(&prefix))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();

        Ok((0, matches))
    }
}

impl Hinter for CommandCompleter {
    type Hint = String;
}

impl Highlighter for CommandCompleter {}
impl Validator for CommandCompleter {}
impl Helper for CommandCompleter {}

/// Asks for a filename on the console when saving an unnamed disk
struct PromptRequester<'a> {
    rl: &'a mut Console,
}

impl FileRequester for PromptRequester<'_> {
    fn request_save_path(&mut self, format: DiskFormat) -> Option<PathBuf> {
        let prompt = format!("Save {} image as: ", format.name());
        match self.rl.readline(&prompt) {
            Ok(line) if !line.trim().is_empty() => {
                let mut path = PathBuf::from(line.trim());
                if path.extension().is_none() {
                    path.set_extension(format.extension());
                }
                Some(path)
            }
            _ => None,
        }
    }
}

/// Get the path to the history file
fn history_path() -> Option<PathBuf> {
    dirs::home_dir().map(|mut p| {
        p.push(".vdisk_history");
        p
    })
}

fn main() {
    env_logger::init();

    println!("=== vdisk ===");
    println!("Interactive console for Dragon and CoCo virtual floppy disks.");
    println!("Type 'help' for available commands\n");

    let mut rl: Console = Editor::new().expect("Failed to create editor");
    rl.set_helper(Some(CommandCompleter::new()));

    if let Some(history_path) = history_path() {
        let _ = rl.load_history(&history_path);
    }

    let mut config = DiskConfig::default();
    let mut disk: Option<VirtualDisk> = None;

    loop {
        let input = match rl.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                if let Some(history_path) = history_path() {
                    let _ = rl.save_history(&history_path);
                }
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        };

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(input);

        let parts = parse_command_line(input);
        if parts.is_empty() {
            continue;
        }
        let command = parts[0].to_lowercase();

        match command.as_str() {
            "help" => print_help(),
            "quit" | "exit" => {
                if let Some(history_path) = history_path() {
                    let _ = rl.save_history(&history_path);
                }
                println!("Goodbye!");
                break;
            }
            "open" | "load" => {
                if parts.len() < 2 {
                    println!("Usage: open <path>");
                    continue;
                }
                match VirtualDisk::open(&parts[1], &config) {
                    Ok(d) => {
                        println!("Opened: {} ({})", parts[1], d.format().name());
                        if d.is_headerless_os9() {
                            println!("Headerless OS-9 image detected");
                        }
                        disk = Some(d);
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            "create" => {
                let cylinders = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(40);
                let heads = parts.get(2).and_then(|s| s.parse().ok()).unwrap_or(1);
                let single_density = parts.get(3).is_some_and(|s| s.eq_ignore_ascii_case("fm"));
                let builder = VirtualDisk::builder()
                    .config(config)
                    .num_cylinders(cylinders)
                    .num_heads(heads);
                let builder = if single_density {
                    builder.double_density(false).sectors_per_track(10)
                } else {
                    builder
                };
                match builder.build() {
                    Ok(d) => {
                        println!(
                            "Created new {}-cylinder {}-sided disk",
                            d.num_cylinders(),
                            if d.num_heads() == 2 { "double" } else { "single" }
                        );
                        disk = Some(d);
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            "info" => {
                if let Some(ref d) = disk {
                    print_info(d);
                } else {
                    println!("No disk loaded. Use 'open <path>' or 'create' first.");
                }
            }
            "sectors" => {
                if let Some(ref d) = disk {
                    if parts.len() < 2 {
                        println!("Usage: sectors <cylinder> [head]");
                        continue;
                    }
                    let cyl: usize = parts[1].parse().unwrap_or(0);
                    let head: usize = parts.get(2).and_then(|s| s.parse().ok()).unwrap_or(0);
                    list_sectors(d, cyl, head);
                } else {
                    println!("No disk loaded.");
                }
            }
            "map" => {
                if let Some(ref d) = disk {
                    let head: usize = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(0);
                    vdisk::map::draw_track_map(d, head);
                } else {
                    println!("No disk loaded.");
                }
            }
            "read-sector" => {
                if let Some(ref d) = disk {
                    let Some((cyl, head, sector)) = parse_chs(&parts) else {
                        println!("Usage: read-sector <cylinder> <head> <sector_id>");
                        continue;
                    };
                    let mut buf = [0u8; 1024];
                    match d.fetch_sector(cyl, head, sector, &mut buf) {
                        Ok(n) => {
                            println!("Sector {}:{}:{} ({} bytes):", cyl, head, sector, n);
                            print_hex_dump(&buf[..n], 1024);
                        }
                        Err(e) => println!("Error: {}", e),
                    }
                } else {
                    println!("No disk loaded.");
                }
            }
            "write-sector" => {
                if let Some(ref mut d) = disk {
                    let Some((cyl, head, sector)) = parse_chs(&parts) else {
                        println!("Usage: write-sector <cylinder> <head> <sector_id> <fill_byte>");
                        continue;
                    };
                    let fill = parts.get(4).and_then(|s| parse_hex_or_dec(s)).unwrap_or(0);
                    match d.update_sector(cyl, head, sector, &[fill; 1024]) {
                        Ok(()) => println!("Filled sector {}:{}:{} with 0x{:02X}", cyl, head, sector, fill),
                        Err(e) => println!("Error: {}", e),
                    }
                } else {
                    println!("No disk loaded.");
                }
            }
            "format-track" => {
                if let Some(ref mut d) = disk {
                    if parts.len() < 3 {
                        println!("Usage: format-track <cylinder> <head> [sectors] [size_code] [fm]");
                        continue;
                    }
                    let cyl: u8 = parts[1].parse().unwrap_or(0);
                    let head: u8 = parts[2].parse().unwrap_or(0);
                    let single_density = parts.iter().any(|p| p.eq_ignore_ascii_case("fm"));
                    let default_sectors = if single_density { 10 } else { 18 };
                    let nsectors = parts
                        .get(3)
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(default_sectors);
                    let size_code = parts.get(4).and_then(|s| s.parse().ok()).unwrap_or(1);
                    match d.format_track(!single_density, cyl, head, nsectors, 1, size_code) {
                        Ok(()) => println!("Formatted cylinder {} head {}", cyl, head),
                        Err(e) => println!("Error: {}", e),
                    }
                } else {
                    println!("No disk loaded.");
                }
            }
            "write-protect" => {
                if let Some(ref mut d) = disk {
                    if let Some(on) = parts.get(1).and_then(|s| parse_on_off(s)) {
                        d.set_write_protect(on);
                    }
                    println!("Write protect: {}", on_off(d.is_write_protected()));
                } else {
                    println!("No disk loaded.");
                }
            }
            "write-back" => {
                // Applies to the loaded disk and to disks opened later
                if let Some(on) = parts.get(1).and_then(|s| parse_on_off(s)) {
                    config = config.with_write_back(on);
                    if let Some(ref mut d) = disk {
                        d.set_write_back(on);
                    }
                }
                println!("Write back: {}", on_off(config.write_back));
            }
            "save" => {
                if let Some(ref mut d) = disk {
                    let result = match parts.get(1) {
                        Some(path) => d.save_as(path),
                        None => d.save_with(true, &mut PromptRequester { rl: &mut rl }),
                    };
                    match result {
                        Ok(()) => {
                            if let Some(path) = d.filename() {
                                println!("Saved to: {}", path.display());
                            }
                        }
                        Err(e) => println!("Error: {}", e),
                    }
                } else {
                    println!("No disk loaded.");
                }
            }
            _ => {
                println!("Unknown command: {}. Type 'help' for available commands.", command);
            }
        }
    }
}

/// Parse command line input, respecting quoted strings
fn parse_command_line(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in input.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
            }
            ' ' | '\t' if !in_quotes => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            _ => {
                current.push(ch);
            }
        }
    }

    if !current.is_empty() {
        parts.push(current);
    }

    parts
}

fn print_help() {
    println!("Available commands:");
    println!("  open <path>                        - Open a VDK, JVC/DSK/OS9 or DMK image");
    println!("  create [cyls] [heads] [fm]         - Create a new formatted disk (default 40 1)");
    println!("  info                               - Show disk information");
    println!("  sectors <cyl> [head]               - List the ID fields on a track");
    println!("  map [head]                         - Visual track map (white=MFM, yellow=FM, red=error)");
    println!("  read-sector <cyl> <head> <id>      - Read and display a sector");
    println!("  write-sector <cyl> <head> <id> <b> - Fill a sector with byte b");
    println!("  format-track <cyl> <head> [n] [code] [fm] - Format a track with n sectors");
    println!("  write-protect [on|off]             - Show or set the write-protect tab");
    println!("  write-back [on|off]                - Show or set whether saves are written");
    println!("  save [path]                        - Save image (format from extension)");
    println!("  help                               - Show this help");
    println!("  quit, exit                         - Exit");
}

fn print_info(disk: &VirtualDisk) {
    if let Some(filename) = disk.filename() {
        println!("Filename: {}", filename.display());
    }
    println!("Format: {}", disk.format().name());
    println!("Cylinders: {}", disk.num_cylinders());
    println!("Heads: {}", disk.num_heads());
    println!("Track length: {:#06x} bytes", disk.track_length());
    if let Some(params) = &disk.extras().jvc {
        println!("Sectors per track: {}", params.sectors_per_track);
        println!("Size code: {}", params.size_code);
        println!("First sector ID: {}", params.first_sector);
    }
    if disk.is_headerless_os9() {
        println!("Headerless OS-9: Yes");
    }
    println!("Write protect: {}", on_off(disk.is_write_protected()));
    println!("Write back: {}", on_off(disk.write_back()));
    println!("Changed: {}", if disk.is_changed() { "Yes" } else { "No" });
}

fn list_sectors(disk: &VirtualDisk, cyl: usize, head: usize) {
    let ids = disk.sector_ids(cyl, head);
    if ids.is_empty() {
        println!("No sectors on cylinder {} head {}.", cyl, head);
        return;
    }

    println!(
        "{:<6} {:<6} {:<6} {:<6} {:<12} {:<6}",
        "Slot", "Cyl", "Head", "ID", "Size", "Mode"
    );
    println!("{}", "-".repeat(48));
    for (slot, id) in ids.iter().enumerate() {
        let size = match id.size_bytes() {
            Some(bytes) => format!("{} ({})", id.size_code, bytes),
            None => format!("{} (?)", id.size_code),
        };
        println!(
            "{:<6} {:<6} {:<6} {:<6} {:<12} {:<6}",
            slot,
            id.cylinder,
            id.head,
            id.sector,
            size,
            if id.mode.is_double_density() { "MFM" } else { "FM" }
        );
    }
}

fn print_hex_dump(data: &[u8], max_bytes: usize) {
    let len = data.len().min(max_bytes);

    for (i, chunk) in data[..len].chunks(16).enumerate() {
        print!("{:04X}: ", i * 16);

        for (j, byte) in chunk.iter().enumerate() {
            print!("{:02X} ", byte);
            if j == 7 {
                print!(" ");
            }
        }

        // Pad if less than 16 bytes
        for j in chunk.len()..16 {
            print!("   ");
            if j == 7 {
                print!(" ");
            }
        }

        print!(" |");
        for byte in chunk {
            let c = if *byte >= 32 && *byte < 127 {
                *byte as char
            } else {
                '.'
            };
            print!("{}", c);
        }
        println!("|");
    }

    if data.len() > max_bytes {
        println!("... ({} more bytes)", data.len() - max_bytes);
    }
}

fn parse_hex_or_dec(s: &str) -> Option<u8> {
    if s.starts_with("0x") || s.starts_with("0X") {
        u8::from_str_radix(&s[2..], 16).ok()
    } else {
        s.parse().ok()
    }
}

fn parse_chs(parts: &[String]) -> Option<(u8, u8, u8)> {
    let cyl = parse_hex_or_dec(parts.get(1)?)?;
    let head = parse_hex_or_dec(parts.get(2)?)?;
    let sector = parse_hex_or_dec(parts.get(3)?)?;
    Some((cyl, head, sector))
}

fn parse_on_off(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "on" | "yes" | "true" | "1" => Some(true),
        "off" | "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "On"
    } else {
        "Off"
    }
}
