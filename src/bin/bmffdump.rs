use clap::{ArgAction, Parser};
use bmffbox::api::{BoxSummary, hex_range, scan_boxes};
use bmffbox::default_registry;
use std::fs::File;

#[derive(Parser, Debug)]
#[command(version, about = "ISO-BMFF/HEIF box explorer")]
struct Args {
    /// MP4/HEIF file path
    path: String,

    /// Limit recursion depth for tree output
    #[arg(long, default_value_t = 64)]
    max_depth: usize,

    /// Emit JSON instead of a human-readable tree
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// Hex-dump a byte range: offset
    #[arg(long)]
    dump_offset: Option<u64>,

    /// Hex-dump a byte range: length
    #[arg(long, default_value_t = 256)]
    dump_len: u64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut f = File::open(&args.path)?;
    let file_len = f.metadata()?.len();
    let registry = default_registry();

    if let Some(offset) = args.dump_offset {
        let dump = hex_range(&mut f, file_len, offset, args.dump_len)?;
        print!("{}", dump.hex);
        return Ok(());
    }

    let boxes = scan_boxes(&mut f, file_len, &registry)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&boxes)?);
        return Ok(());
    }

    for b in &boxes {
        print_box(b, 0, args.max_depth);
    }
    Ok(())
}

fn print_box(b: &BoxSummary, depth: usize, max_depth: usize) {
    let indent = "  ".repeat(depth);
    let extra = match (&b.version, &b.uuid) {
        (Some(v), _) => format!(" (ver={}, flags=0x{:06x})", v, b.flags.unwrap_or(0)),
        (None, Some(u)) => format!(" uuid:{}", u),
        _ => String::new(),
    };
    println!(
        "{indent}{:>8} {:>10} {}{}",
        format!("{:#x}", b.offset),
        b.size,
        b.typ,
        extra
    );
    if let Some(children) = &b.children {
        if depth + 1 <= max_depth {
            for c in children {
                print_box(c, depth + 1, max_depth);
            }
        }
    }
}
