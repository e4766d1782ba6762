// Atomic batch writes with a cross-field validator
//
// Run with: cargo run --example batch_commit

use modset::{Definition, EngineContext, MemoryStore, truthy};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let engine = EngineContext::builder(MemoryStore::new()).build()?;
    engine.registry().define("auth", |schema| {
        schema
            .setting(Definition::boolean("credentials.email_password.enabled", true).group("Credentials"))?
            .setting(Definition::boolean("credentials.magic_link.enabled", true).group("Credentials"))?
            .setting(Definition::integer("session.timeout", 3600).group("Sessions").min(60))
    })?;

    // At least one sign-in method must stay available
    let methods = [
        ("auth.credentials.email_password.enabled", "auth.credentials.magic_link.enabled"),
        ("auth.credentials.magic_link.enabled", "auth.credentials.email_password.enabled"),
    ];
    for (own, other) in methods {
        engine.add_validator(own, move |value, state| {
            if truthy(value) || state.is_truthy(other) {
                Ok(())
            } else {
                Err("at least one sign-in method must remain enabled".into())
            }
        });
    }

    engine.events().on_change(|key, old, new| {
        println!("changed {key}: {old} -> {new}");
    });

    // A form submission: every pair is written or none is
    let report = engine
        .batch("auth")
        .set("auth.session.timeout", "7200")
        .set("auth.credentials.magic_link.enabled", "false")
        .commit()?;
    println!("changed: {:?}, unchanged: {:?}", report.changed, report.unchanged);

    let vetoed = engine
        .batch("auth")
        .set("auth.session.timeout", "900")
        .set("auth.credentials.email_password.enabled", "false")
        .commit();
    match vetoed {
        Ok(_) => println!("unexpected success"),
        Err(e) => println!("batch rolled back: {e}"),
    }

    // Nothing from the vetoed batch is visible
    println!("session.timeout = {:?}", engine.get("auth.session.timeout"));

    Ok(())
}
