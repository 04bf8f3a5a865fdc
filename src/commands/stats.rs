use crate::commands::{Common, CommonArgs};
use dependagraph::Result;

/// Print the size of the stored graph
pub fn show_stats(args: &CommonArgs) -> Result<()> {
    let common = Common::new(args)?;
    let stats = common.store.stats()?;

    println!("Nodes:    {}", stats.nodes);
    println!("Edges:    {}", stats.edges);
    println!("Targeted: {}", stats.targeted);
    println!("Frontier: {}", stats.frontier);

    Ok(())
}
