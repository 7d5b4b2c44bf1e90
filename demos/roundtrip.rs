//! Loads a node file in either format, prints it, and writes it back out.
//!
//! Run with: cargo run --example roundtrip -- [input] [output.bin]
//!
//! Without arguments a small document is built in memory instead.

use acm::{acm, load_file, to_string, write_file, Branch, WriteOptions};
use std::error::Error;

fn sample() -> Branch {
    acm!(object project {
        string name = "roundtrip demo",
        uint version = 2,
        object video {
            uint16 width = 1280,
            uint16 height = 720,
            bool vsync = true,
        },
        array string maps = ["start", "boss room"],
    })
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let mut args = std::env::args().skip(1);
    let root = match args.next() {
        Some(path) => load_file(path)?,
        None => sample(),
    };

    println!("Tree:");
    root.print_tree();

    println!("\nText:");
    println!("{}", to_string(&root)?);

    if let Some(output) = args.next() {
        write_file(&output, &root, &WriteOptions::binary())?;
        let back = load_file(&output)?;
        let status = if back == root { "ok" } else { "MISMATCH" };
        println!("binary round trip to {}: {}", output, status);
    }

    Ok(())
}
