use lark_core::Runtime;

pub fn run(runtime: &Runtime) {
    let names = runtime.providers().names();
    println!("Registered providers ({}):", names.len());
    for name in names {
        let Ok(provider) = runtime.providers().lookup(&name) else {
            continue;
        };
        let configured = runtime.providers().config_store().get(&name).is_some();
        println!(
            "{}",
            provider_line(
                &name,
                provider.default_model(),
                configured,
                name == runtime.default_provider(),
            )
        );
    }
}

fn provider_line(name: &str, model: Option<&str>, configured: bool, is_default: bool) -> String {
    let mut line = format!("{name} - model: {}", model.unwrap_or("(none)"));
    if configured {
        line.push_str(", configured");
    }
    if is_default {
        line.push_str(" (default)");
    }
    line
}
