//! Order commands.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use clap::Args;
use desk_api::{Order, OrderDraft, OrderSearchParams, OrderStatus, Page, RecordId};

/// Order fields accepted by `orders create` and `orders update`.
#[derive(Debug, Default, Args)]
pub struct OrderFields {
    /// Customer name
    #[arg(long)]
    pub customer: Option<String>,
    /// Customer phone (11 digits)
    #[arg(long)]
    pub phone: Option<String>,
    /// Customer email
    #[arg(long)]
    pub email: Option<String>,
    /// Vehicle license plate
    #[arg(long)]
    pub plate: Option<String>,
    /// Product name
    #[arg(long)]
    pub product: Option<String>,
    /// Product quantity
    #[arg(long)]
    pub quantity: Option<i64>,
    /// Order status (pending, completed, cancelled)
    #[arg(long)]
    pub status: Option<OrderStatus>,
    /// Free-form remarks
    #[arg(long)]
    pub remarks: Option<String>,
}

impl OrderFields {
    /// Overwrite the draft with every field that was given.
    pub fn apply(self, draft: &mut OrderDraft) {
        if let Some(customer) = self.customer {
            draft.customer_name = customer;
        }
        if let Some(phone) = self.phone {
            draft.customer_phone = phone;
        }
        if let Some(email) = self.email {
            draft.customer_email = Some(email);
        }
        if let Some(plate) = self.plate {
            draft.license_plate = Some(plate);
        }
        if let Some(product) = self.product {
            draft.product_name = product;
        }
        if let Some(quantity) = self.quantity {
            draft.product_quantity = quantity;
        }
        if let Some(status) = self.status {
            draft.order_status = status;
        }
        if let Some(remarks) = self.remarks {
            draft.remarks = Some(remarks);
        }
    }
}

fn print_orders(orders: &[Order]) {
    if orders.is_empty() {
        println!("No orders found");
        return;
    }

    println!(
        "{:<8} {:<20} {:<14} {:<12} {:<10} {:<18} {}",
        "ID", "Order No", "Customer", "Phone", "Plate", "Product", "Status"
    );
    println!("{}", "-".repeat(100));
    for order in orders {
        println!(
            "{:<8} {:<20} {:<14} {:<12} {:<10} {:<18} {}",
            order.id,
            output::or_dash(Some(order.order_no.as_str())),
            order.customer_name,
            order.customer_phone,
            output::or_dash(order.license_plate.as_deref()),
            format!("{} x{}", order.product_name, order.product_quantity),
            order.order_status
        );
    }
}

fn print_page(page: &Page<Order>, page_size: u32, format: &OutputFormat) {
    match format {
        OutputFormat::Text => {
            print_orders(&page.records);
            println!(
                "\nPage {} of {} ({} orders)",
                page.current.max(1),
                page.total_pages(u64::from(page_size)),
                page.total
            );
        }
        OutputFormat::Json => output::print_json(page),
    }
}

fn print_order(order: &Order, format: &OutputFormat) {
    match format {
        OutputFormat::Text => {
            println!("Order Details");
            output::print_divider();
            output::print_row("ID", &order.id);
            output::print_row("Order No", output::or_dash(Some(order.order_no.as_str())));
            output::print_row("Customer", &order.customer_name);
            output::print_row("Phone", &order.customer_phone);
            output::print_row("Email", output::or_dash(order.customer_email.as_deref()));
            output::print_row("Plate", output::or_dash(order.license_plate.as_deref()));
            output::print_row("Product", &order.product_name);
            output::print_row("Quantity", &order.product_quantity.to_string());
            output::print_row("Status", order.order_status.label());
            output::print_row("Remarks", output::or_dash(order.remarks.as_deref()));
            output::print_row("Created", output::or_dash(Some(order.created_at.as_str())));
            output::print_row("Updated", output::or_dash(Some(order.updated_at.as_str())));
        }
        OutputFormat::Json => output::print_json(order),
    }
}

/// Public order lookup by license plate. Works without logging in.
pub async fn lookup(ctx: &Context, plate: &str) -> Result<()> {
    let desk = ctx.connect().await?;

    match desk.client.orders.lookup_by_license_plate(plate).await {
        Ok(orders) => match ctx.format {
            OutputFormat::Text => print_orders(&orders),
            OutputFormat::Json => output::print_json(&orders),
        },
        Err(e) => ctx.report(&e),
    }

    Ok(())
}

/// List orders, optionally filtered by keyword.
pub async fn orders_list(
    ctx: &Context,
    page: u32,
    size: u32,
    keyword: Option<&str>,
) -> Result<()> {
    let Some(desk) = ctx.connect_logged_in().await? else {
        return Ok(());
    };

    match desk.client.orders.list(page, size, keyword).await {
        Ok(result) => print_page(&result, size, &ctx.format),
        Err(e) => ctx.report(&e),
    }

    Ok(())
}

/// Search orders with structured filters.
pub async fn orders_search(ctx: &Context, params: OrderSearchParams) -> Result<()> {
    let Some(desk) = ctx.connect_logged_in().await? else {
        return Ok(());
    };

    match desk.client.orders.search(&params).await {
        Ok(result) => print_page(&result, params.page_size, &ctx.format),
        Err(e) => ctx.report(&e),
    }

    Ok(())
}

/// Show a single order.
pub async fn orders_show(ctx: &Context, id: &str) -> Result<()> {
    let Some(desk) = ctx.connect_logged_in().await? else {
        return Ok(());
    };

    match desk.client.orders.get(id).await {
        Ok(order) => print_order(&order, &ctx.format),
        Err(e) => ctx.report(&e),
    }

    Ok(())
}

/// Create an order.
pub async fn orders_create(ctx: &Context, fields: OrderFields) -> Result<()> {
    let Some(desk) = ctx.connect_logged_in().await? else {
        return Ok(());
    };

    let mut draft = OrderDraft::default();
    fields.apply(&mut draft);

    match desk.client.orders.create(&draft).await {
        Ok(Some(order)) => print_order(&order, &ctx.format),
        Ok(None) => output::print_success("Order created", &ctx.format),
        Err(e) => ctx.report(&e),
    }

    Ok(())
}

/// Update an order. Fields not given keep their current value.
pub async fn orders_update(ctx: &Context, id: &str, fields: OrderFields) -> Result<()> {
    let Some(desk) = ctx.connect_logged_in().await? else {
        return Ok(());
    };

    let current = match desk.client.orders.get(id).await {
        Ok(order) => order,
        Err(e) => {
            ctx.report(&e);
            return Ok(());
        }
    };

    let mut draft = OrderDraft::from_order(&current);
    fields.apply(&mut draft);

    match desk.client.orders.update(id, &draft).await {
        Ok(Some(order)) => print_order(&order, &ctx.format),
        Ok(None) => output::print_success(&format!("Order {} updated", id), &ctx.format),
        Err(e) => ctx.report(&e),
    }

    Ok(())
}

/// Delete one or more orders.
pub async fn orders_delete(ctx: &Context, ids: &[RecordId]) -> Result<()> {
    let Some(desk) = ctx.connect_logged_in().await? else {
        return Ok(());
    };

    if let [id] = ids {
        match desk.client.orders.delete(id).await {
            Ok(()) => output::print_success(&format!("Order {} deleted", id), &ctx.format),
            Err(e) => ctx.report(&e),
        }
        return Ok(());
    }

    let outcome = desk.client.orders.delete_many(ids).await;
    match ctx.format {
        OutputFormat::Text => {
            println!("Deleted {} of {} orders", outcome.succeeded.len(), ids.len());
            for (id, error) in &outcome.failed {
                println!("  {:<8} {}", id, error.user_message());
            }
        }
        OutputFormat::Json => {
            let failed: Vec<_> = outcome
                .failed
                .iter()
                .map(|(id, error)| serde_json::json!({ "id": id, "message": error.user_message() }))
                .collect();
            output::print_json(&serde_json::json!({
                "succeeded": outcome.succeeded,
                "failed": failed,
            }));
        }
    }

    Ok(())
}

/// Change an order's status.
pub async fn orders_status(ctx: &Context, id: &str, status: OrderStatus) -> Result<()> {
    let Some(desk) = ctx.connect_logged_in().await? else {
        return Ok(());
    };

    match desk.client.orders.update_status(id, status).await {
        Ok(()) => output::print_success(
            &format!("Order {} marked {}", id, status.label()),
            &ctx.format,
        ),
        Err(e) => ctx.report(&e),
    }

    Ok(())
}
