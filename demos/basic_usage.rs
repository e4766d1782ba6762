// Basic usage example for modset
//
// Run with: cargo run --example basic_usage

use modset::{
    Definition, DocsConfig, EngineContext, EnumSource, FieldState, FileStore, Schema,
    generate_docs,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Settings persist to ./example_config/settings.json
    let store = FileStore::open("./example_config/settings.json")?;
    let engine = EngineContext::builder(store)
        .with_builtin(
            Schema::new("core").setting(
                Definition::string("site.name", "My App")
                    .group("General")
                    .description("Name shown in page titles"),
            )?,
        )
        .build()?;

    // Modules register their own categories during bootstrap
    engine.registry().define("network", |schema| {
        schema
            .setting(
                Definition::integer("http.port", 8080)
                    .group("HTTP")
                    .description("Server port")
                    .min(1024)
                    .max(65535),
            )?
            .setting(Definition::boolean("proxy.enabled", false).group("Proxy"))?
            .setting(
                Definition::string("proxy.url", "")
                    .group("Proxy")
                    .pattern(r"^(https?://.+)?$")
                    .depends_on("network.proxy.enabled"),
            )
    })?;
    engine.registry().define("appearance", |schema| {
        schema.setting(
            Definition::enumeration(
                "theme",
                "light",
                EnumSource::fixed(["light", "dark", "auto"]),
            )
            .description("UI theme preference"),
        )
    })?;

    println!("Port: {:?}", engine.get("network.http.port"));

    engine.set("network.http.port", "9090")?;
    engine.set("appearance.theme", "dark")?;
    println!("Port after write: {:?}", engine.get("network.http.port"));

    // Values outside the declared range are rejected
    if let Err(e) = engine.set("network.http.port", 80) {
        println!("Rejected: {e}");
    }

    // The proxy URL is only editable once the proxy is switched on
    println!("proxy.url: {}", engine.field_state("network.proxy.url")?);
    engine.set("network.proxy.enabled", true)?;
    assert_eq!(engine.field_state("network.proxy.url")?, FieldState::Editable);

    // Administrators can freeze a setting
    engine.configure(|locks| locks.lock("core.site.name"));
    if let Err(e) = engine.set("core.site.name", "Other") {
        println!("Rejected: {e}");
    }

    for (key, value) in engine.snapshot("network") {
        println!("{key} = {value}");
    }

    println!("\n{}", generate_docs(engine.registry(), DocsConfig::new().with_title("My App Settings")));

    Ok(())
}
