//! List the matrices stored in a binsparse container

use bsp::list_matrices;
use tracing_subscriber::EnvFilter;

fn main() -> bsp::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: bsp_ls <file.bsp>");
        std::process::exit(1);
    };

    for summary in list_matrices(&path)? {
        println!("{summary}");
        for (component, tag) in &summary.descriptor.data_types {
            println!("    {component}: {tag}");
        }
    }
    Ok(())
}
