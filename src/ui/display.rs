//! Result messages and the bulk manifest listing.

use std::path::Path;

use bytesize::ByteSize;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, CellAlignment, Table};
use console::style;
use vlock::bulk::BulkManifest;
use vlock::types::ProcessorMode;

pub fn format_bytes(bytes: u64) -> String {
    ByteSize::b(bytes).to_string()
}

pub fn manifest_table(manifest: &BulkManifest) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED).set_header(["Id", "Path", "Size", "Encrypted"]);

    for entry in &manifest.files {
        table.add_row([
            Cell::new(&entry.id),
            Cell::new(&entry.path),
            Cell::new(format_bytes(entry.size)).set_alignment(CellAlignment::Right),
            Cell::new(format_bytes(entry.length)).set_alignment(CellAlignment::Right),
        ]);
    }

    table
}

pub fn show_manifest(manifest: &BulkManifest) {
    println!();
    println!(
        "{} {}",
        style("✓").green(),
        style(format!("{} file(s), {} total, archive format {}", manifest.total_files, format_bytes(manifest.total_size), manifest.version)).bold()
    );
    println!("{}", manifest_table(manifest));
}

pub fn show_success(mode: ProcessorMode, path: &Path) {
    println!();
    println!("{} {}", style("✓").green(), style(format!("File {} successfully: {}", mode.done(), path.display())).bold());
}

pub fn show_extracted(count: usize, root: &Path) {
    println!();
    println!("{} {}", style("✓").green(), style(format!("Extracted {count} file(s) into {}", root.display())).bold());
}

pub fn show_warning(message: &str) {
    eprintln!("{} {}", style("!").yellow(), style(message).yellow());
}

pub fn print_banner() {
    println!("{}", style(format!("{} {}", vlock::config::APP_NAME, env!("CARGO_PKG_VERSION"))).green().bold());
}
