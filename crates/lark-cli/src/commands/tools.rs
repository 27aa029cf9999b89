use lark_core::Runtime;
use lark_tools::{ToolDescriptor, ToolKind, ToolRegistry};

pub fn list(runtime: &Runtime, name: Option<&str>) -> anyhow::Result<()> {
    match name {
        Some(name) => print_tool_detail(runtime.tools(), name)?,
        None => print_tool_list(runtime.tools()),
    }
    Ok(())
}

/// Run one tool with JSON arguments and print its output.
pub async fn invoke(runtime: &Runtime, name: &str, args: &str) -> anyhow::Result<()> {
    let output = runtime.tools().invoke_json(name, args).await?;
    println!("{output}");
    Ok(())
}

fn print_tool_list(tools: &ToolRegistry) {
    let all = tools.all();
    println!("Loaded tools ({}):", all.len());
    for tool in all {
        println!("{}", summary_line(&tool));
    }
}

fn print_tool_detail(tools: &ToolRegistry, name: &str) -> anyhow::Result<()> {
    let tool = tools
        .lookup(name)
        .map_err(|_| anyhow::anyhow!("Unknown tool: {name}"))?;
    let schema = serde_json::to_string_pretty(&tool.parameters_schema())?;

    println!("name: {}", tool.name());
    println!("kind: {}", kind_label(tool.kind()));
    println!("description: {}", tool.description());
    println!("parameters:");
    println!("{schema}");

    Ok(())
}

fn summary_line(tool: &ToolDescriptor) -> String {
    format!(
        "{} [{}] - {}",
        tool.name(),
        kind_label(tool.kind()),
        tool.description()
    )
}

fn kind_label(kind: ToolKind) -> &'static str {
    match kind {
        ToolKind::Builtin => "builtin",
        ToolKind::Custom => "custom",
    }
}
