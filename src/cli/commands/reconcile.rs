use crate::config::Config;

pub async fn cmd_reconcile(config: &Config) -> anyhow::Result<()> {
    let lookup = super::build_lookup_service(config).await?;

    lookup.reconciler().mark_expired().await?;
    println!("✓ Expiry reconciliation complete");

    Ok(())
}
