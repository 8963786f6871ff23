//! Subcommand execution and output.

use cartsync::{
    errors::CartError,
    ids::{LineItemId, VariantId},
    items::ProductContext,
    prices::{PriceError, to_minor_units},
    session::Session,
    store::{CartSnapshot, CartStore},
};
use thiserror::Error;

use crate::config::{AddArgs, Command};

/// Errors raised while running a subcommand.
#[derive(Debug, Error)]
pub(crate) enum CommandError {
    /// The `--price` argument is not a valid amount.
    #[error("invalid price: {0}")]
    Price(#[from] PriceError),

    /// The cart operation failed.
    #[error(transparent)]
    Cart(#[from] CartError),
}

/// Run `command` against the store, returning the cart it leaves behind.
pub(crate) async fn execute(
    command: &Command,
    store: &CartStore,
    session: &Session,
) -> Result<CartSnapshot, CommandError> {
    if let Command::Clear { purge } = command {
        return Ok(store.clear(*purge).await?);
    }

    // Stock checks compare against the loaded cart.
    store.reload(session).await?;

    let snapshot = match command {
        Command::Show | Command::Clear { .. } => store.snapshot(),
        Command::Add(args) => {
            store
                .add_item(
                    session,
                    &product_context(args)?,
                    VariantId::new(args.variant_id),
                    args.quantity,
                )
                .await?
        }
        Command::Remove { item_id } => {
            store
                .remove_item(session, LineItemId::new(*item_id))
                .await?
        }
        Command::SetQuantity {
            item_id,
            variant_id,
            quantity,
        } => {
            store
                .update_quantity(
                    session,
                    LineItemId::new(*item_id),
                    VariantId::new(*variant_id),
                    *quantity,
                )
                .await?
        }
        Command::Coupon { code } => store.apply_coupon(session, code).await?,
        Command::Adopt => store.adopt_guest_cart(session).await?,
    };

    Ok(snapshot)
}

fn product_context(args: &AddArgs) -> Result<ProductContext, PriceError> {
    Ok(ProductContext {
        product_name: args.name.clone(),
        brand_name: args.brand.clone(),
        color_name: args.color.clone(),
        size_name: args.size.clone(),
        unit_price: to_minor_units(args.price)?,
        available_quantity: args.stock,
        image_url: args.image.clone(),
    })
}

/// Human-readable cart listing with totals.
pub(crate) fn render(snapshot: &CartSnapshot, store: &CartStore) -> String {
    if snapshot.is_empty() {
        return "Your cart is empty.".to_string();
    }

    let mut lines: Vec<String> = snapshot
        .items
        .iter()
        .map(|item| {
            let details: Vec<&str> = [
                item.brand_name.as_str(),
                item.color_name.as_str(),
                item.size_name.as_str(),
            ]
            .into_iter()
            .filter(|detail| !detail.is_empty())
            .collect();

            let line_total = item
                .line_total()
                .map_or_else(|| "-".to_string(), |total| store.format_amount(total));

            format!(
                "#{id} {name} [variant {variant}{details}] {quantity} x {price} = {line_total}",
                id = item.id,
                name = item.product_name,
                variant = item.variant_id,
                details = if details.is_empty() {
                    String::new()
                } else {
                    format!(", {}", details.join(", "))
                },
                quantity = item.quantity,
                price = store.format_amount(item.unit_price),
            )
        })
        .collect();

    lines.push(String::new());
    lines.push(format!("Items:    {}", snapshot.count));
    lines.push(format!(
        "Subtotal: {}",
        store.format_amount(snapshot.totals.subtotal)
    ));

    if let Some(coupon) = &snapshot.coupon {
        lines.push(format!(
            "Discount: -{} ({})",
            store.format_amount(snapshot.totals.discount),
            coupon.code
        ));
    }

    lines.push(format!("Total:    {}", store.format_amount(snapshot.totals.total)));

    lines.join("\n")
}
