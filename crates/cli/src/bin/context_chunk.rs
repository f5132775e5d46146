use anyhow::Result;

fn main() -> Result<()> {
    context_chunk_cli::main_entry()
}
