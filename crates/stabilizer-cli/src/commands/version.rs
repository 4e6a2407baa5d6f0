use miette::{IntoDiagnostic, Result};
use stabilizer_core::VERSION;

pub fn run(json: bool) -> Result<()> {
    if json {
        let value = serde_json::json!({ "name": "stabilizer", "version": VERSION });
        println!("{}", serde_json::to_string_pretty(&value).into_diagnostic()?);
    } else {
        println!("stabilizer {VERSION}");
    }
    Ok(())
}
