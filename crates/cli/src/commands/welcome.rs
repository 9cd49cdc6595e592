//! `vera welcome` — Print the introduction and sample prompts.

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let welcome = vera_agent::welcome();

    if json {
        println!("{}", serde_json::to_string_pretty(&welcome)?);
        return Ok(());
    }

    println!("{}", welcome.welcome);
    println!();
    println!("Try asking:");
    for prompt in &welcome.prompts {
        println!("  • {}", prompt.data);
    }

    Ok(())
}
