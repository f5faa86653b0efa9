//! Echo port - simple host step example.
//!
//! This example demonstrates:
//! - Building a controller with a raw and a JSON port
//! - Installing a step context around VM calls
//! - A handler panic coming back as an ordinary error
//!
//! ```text
//! cargo run --example echo
//! ```

use serde::{Deserialize, Serialize};
use vmport::context::{ExecutionContext, GasMeter};
use vmport::{Controller, PortError};

/// Input structure for the greet port.
#[derive(Deserialize, Debug)]
struct GreetInput {
    name: String,
}

/// Output structure for the greet port.
#[derive(Serialize, Debug)]
struct GreetOutput {
    greeting: String,
}

fn main() -> Result<(), PortError> {
    let controller = Controller::builder()
        .handle("echo", |_ctx, req| Ok(req.to_string()))
        .handle_json("greet", |ctx, input: GreetInput| {
            let height = ctx.execution().map(|e| e.block_height()).unwrap_or(0);
            Ok(GreetOutput {
                greeting: format!("hello {} at height {}", input.name, height),
            })
        })
        .handle("crash", |_ctx, _req| -> Result<String, PortError> {
            panic!("handler bug")
        })
        .build();

    for (handle, name) in controller.registry().ports() {
        println!("port {} -> {}", handle, name);
    }

    let exec = ExecutionContext::new("demo-1", 42).with_gas_meter(GasMeter::finite(1_000));
    let step = controller.enter(exec);

    let echo = controller.get_port("echo");
    println!("echo: {}", controller.call(echo, "hi")?);
    println!(
        "greet: {}",
        controller.call_by_name("greet", r#"{"name":"vat"}"#)?
    );

    match controller.call_by_name("crash", "") {
        Ok(out) => println!("crash: {}", out),
        Err(e) => println!("crash failed: {}", e),
    }

    step.release();
    Ok(())
}
