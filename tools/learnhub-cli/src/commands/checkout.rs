//! Checkout command.

use anyhow::Result;
use dialoguer::Confirm;
use serde_json::json;

use super::cart::{load, print_cart};
use super::{cart_failure, CheckoutArgs};
use crate::context::Context;

/// Run the checkout command.
pub async fn run(args: CheckoutArgs, ctx: &Context) -> Result<()> {
    let store = ctx.store(args.yes)?;
    load(&store, ctx).await?;

    let state = store.snapshot();
    if state.is_empty() {
        return store.checkout().await.map(|_| ()).map_err(cart_failure);
    }

    print_cart(&state, ctx);

    if !args.yes && !ctx.output.is_json() {
        let prompt = format!(
            "Place order for {} course(s), {}?",
            state.item_count(),
            state.subtotal().display()
        );
        let confirmed =
            tokio::task::spawn_blocking(move || Confirm::new().with_prompt(prompt).default(true).interact())
                .await??;

        if !confirmed {
            ctx.output.info("Checkout cancelled");
            return Ok(());
        }
    }

    let spinner = ctx.output.spinner("Creating order...");
    let result = store.checkout().await;
    spinner.finish_and_clear();

    let receipt = match result {
        Ok(receipt) => receipt,
        Err(error) => {
            if !store.snapshot().is_empty() {
                ctx.output.warn("Your cart has been kept");
            }
            return Err(cart_failure(error));
        }
    };

    if ctx.output.is_json() {
        ctx.output.json(&json!({
            "order_id": receipt.order_id,
            "payment_ref": receipt.payment_ref,
            "amount": receipt.amount,
        }));
        return Ok(());
    }

    ctx.output.success("Payment complete");
    ctx.output.kv("Order", receipt.order_id.as_str());
    ctx.output.kv("Payment", receipt.payment_ref.as_str());
    ctx.output.kv("Amount", &receipt.amount.display());
    Ok(())
}
