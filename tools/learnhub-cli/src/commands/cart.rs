//! Cart commands.

use anyhow::{bail, Result};
use learnhub_commerce::{CartItem, CartState, CourseId, Money};
use learnhub_store::{FetchOutcome, MutationOutcome};
use serde::Serialize;

use super::{cart_failure, CartArgs, CartCommand};
use crate::context::{CliStore, Context};
use crate::output::{format_price, format_total, truncate};

/// Run the cart command.
pub async fn run(args: CartArgs, ctx: &Context) -> Result<()> {
    match args.command.unwrap_or(CartCommand::Show) {
        CartCommand::Show => show_cart(ctx).await,
        CartCommand::Add {
            course_id,
            name,
            price,
            original_price,
            instructor,
            thumbnail,
        } => {
            let currency = ctx.config.currency()?;
            let mut item = CartItem::new(course_id, name, Money::from_decimal(price, currency));
            if let Some(original) = original_price {
                item = item.with_original_price(Money::from_decimal(original, currency));
            }
            if let Some(instructor) = instructor {
                item = item.with_instructor(instructor);
            }
            if let Some(thumbnail) = thumbnail {
                item = item.with_thumbnail(thumbnail);
            }
            add_course(item, ctx).await
        }
        CartCommand::Remove { course_id } => remove_course(&CourseId::new(course_id), ctx).await,
    }
}

/// Serializable view of the cart for `--json`.
#[derive(Serialize)]
pub struct CartView<'a> {
    pub phase: &'static str,
    pub items: &'a [CartItem],
    pub item_count: usize,
    pub subtotal: Money,
    pub savings: Money,
}

impl<'a> CartView<'a> {
    pub fn new(state: &'a CartState) -> Self {
        Self {
            phase: state.phase().as_str(),
            items: state.items(),
            item_count: state.item_count(),
            subtotal: state.subtotal(),
            savings: state.savings(),
        }
    }
}

/// Fetch the cart with a spinner, warning about skipped entries.
pub async fn load(store: &CliStore, ctx: &Context) -> Result<()> {
    let spinner = ctx.output.spinner("Loading cart...");
    let outcome = store.fetch_cart().await;
    spinner.finish_and_clear();

    match outcome.map_err(cart_failure)? {
        FetchOutcome::Replaced { dropped, .. } if dropped > 0 => {
            ctx.output.warn(&format!("Skipped {} unusable cart entries", dropped));
        }
        _ => {}
    }
    Ok(())
}

/// Print the cart as a table with totals.
pub fn print_cart(state: &CartState, ctx: &Context) {
    if ctx.output.is_json() {
        ctx.output.json(&CartView::new(state));
        return;
    }

    ctx.output.header("Cart");

    if state.is_empty() {
        ctx.output.info("Your cart is empty.");
        return;
    }

    let widths = [16, 36, 20, 24];
    ctx.output.table_row(&["ID", "COURSE", "INSTRUCTOR", "PRICE"], &widths);
    for item in state.items() {
        let id = truncate(item.id.as_str(), widths[0]);
        let name = truncate(&item.name, widths[1]);
        let instructor = truncate(item.instructor.as_deref().unwrap_or("-"), widths[2]);
        let price = format_price(item);
        ctx.output.table_row(&[&id, &name, &instructor, &price], &widths);
    }

    println!();
    ctx.output.kv("Items", &state.item_count().to_string());
    ctx.output.kv("Savings", &format_total(state.savings()));
    ctx.output.kv("Subtotal", &state.subtotal().display());
}

async fn show_cart(ctx: &Context) -> Result<()> {
    let store = ctx.store(false)?;
    load(&store, ctx).await?;
    print_cart(&store.snapshot(), ctx);
    Ok(())
}

async fn add_course(item: CartItem, ctx: &Context) -> Result<()> {
    let store = ctx.store(false)?;
    load(&store, ctx).await?;

    let label = format!("{} ({})", item.name, item.id);
    let spinner = ctx.output.spinner(&format!("Adding {}...", label));
    let outcome = store.add_item(item).await;
    spinner.finish_and_clear();

    match outcome.map_err(cart_failure)? {
        MutationOutcome::Applied => ctx.output.success(&format!("Added {}", label)),
        MutationOutcome::Unchanged => ctx.output.info(&format!("{} is already in your cart", label)),
        MutationOutcome::RolledBack { error } => return Err(cart_failure(error)),
        MutationOutcome::Discarded => bail!("Session ended before the cart was updated"),
    }

    print_cart(&store.snapshot(), ctx);
    Ok(())
}

async fn remove_course(id: &CourseId, ctx: &Context) -> Result<()> {
    let store = ctx.store(false)?;
    load(&store, ctx).await?;

    let spinner = ctx.output.spinner(&format!("Removing {}...", id));
    let outcome = store.remove_item(id).await;
    spinner.finish_and_clear();

    match outcome.map_err(cart_failure)? {
        MutationOutcome::Applied => ctx.output.success(&format!("Removed {}", id)),
        MutationOutcome::Unchanged => ctx.output.info(&format!("{} is not in your cart", id)),
        MutationOutcome::RolledBack { error } => return Err(cart_failure(error)),
        MutationOutcome::Discarded => bail!("Session ended before the cart was updated"),
    }

    print_cart(&store.snapshot(), ctx);
    Ok(())
}
