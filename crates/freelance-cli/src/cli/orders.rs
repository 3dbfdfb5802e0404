//! Order commands: create, list, show, cancel, complete and attach.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Subcommand;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Confirm;

use freelance_core::http::ProgressFn;
use freelance_types::listing::ServiceId;
use freelance_types::order::{
    CreateOrder, Order, OrderId, OrderListParams, OrderRole, OrderStatus,
};

use super::services::upload_bar;
use super::{require_login, truncate};
use crate::state::AppState;

#[derive(Subcommand)]
pub enum OrdersCommand {
    /// List your orders.
    #[command(alias = "ls")]
    List {
        /// Only orders in this status (e.g. in_progress).
        #[arg(long)]
        status: Option<String>,

        /// buyer or seller.
        #[arg(long)]
        role: Option<String>,

        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        page_size: Option<u32>,
    },

    /// Order one package of a service.
    Create {
        /// Service id.
        service: ServiceId,

        /// Package id (see `flc services show`).
        #[arg(long)]
        package: u64,

        /// Notes for the seller.
        #[arg(long)]
        requirements: Option<String>,
    },

    /// Show one order.
    Show {
        /// Order id.
        id: OrderId,
    },

    /// Cancel an order that has not been delivered yet.
    Cancel {
        /// Order id.
        id: OrderId,

        /// Reason shown to the other party.
        #[arg(long, default_value = "")]
        reason: String,

        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },

    /// Accept the delivery and complete the order.
    Complete {
        /// Order id.
        id: OrderId,
    },

    /// Attach a file to an order.
    Attach {
        /// Order id.
        id: OrderId,

        /// File to upload.
        file: PathBuf,
    },
}

/// Handle an orders subcommand. Every order command needs a session.
pub async fn handle_orders_command(cmd: OrdersCommand, state: &AppState, json: bool) -> Result<()> {
    require_login(state)?;
    match cmd {
        OrdersCommand::List {
            status,
            role,
            page,
            page_size,
        } => {
            let params = OrderListParams {
                page,
                page_size,
                status: status
                    .map(|s| s.parse::<OrderStatus>())
                    .transpose()
                    .map_err(|e| anyhow::anyhow!(e))?,
                role: role
                    .map(|r| r.parse::<OrderRole>())
                    .transpose()
                    .map_err(|e| anyhow::anyhow!(e))?,
            };
            list(state, &params, json).await
        }
        OrdersCommand::Create {
            service,
            package,
            requirements,
        } => {
            let order = state
                .orders
                .create(&CreateOrder {
                    service,
                    package,
                    requirements,
                })
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&order)?);
            } else {
                println!(
                    "  {} Placed order {} ({:.2} {})",
                    style("✓").green().bold(),
                    style(&order.order_number).cyan(),
                    order.total_amount,
                    order.currency
                );
            }
            Ok(())
        }
        OrdersCommand::Show { id } => {
            let order = state.orders.get(id).await?;
            print_order(&order, json)
        }
        OrdersCommand::Cancel { id, reason, yes } => cancel(state, id, &reason, yes, json).await,
        OrdersCommand::Complete { id } => {
            let order = state.orders.complete(id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&order)?);
            } else {
                println!(
                    "  {} Order {} completed",
                    style("✓").green().bold(),
                    style(&order.order_number).cyan()
                );
            }
            Ok(())
        }
        OrdersCommand::Attach { id, file } => attach(state, id, file, json).await,
    }
}

fn status_cell(status: OrderStatus) -> Cell {
    let color = match status {
        OrderStatus::Completed => Color::Green,
        OrderStatus::Cancelled | OrderStatus::Refunded => Color::DarkGrey,
        OrderStatus::Disputed => Color::Red,
        OrderStatus::Delivered => Color::Cyan,
        _ => Color::Yellow,
    };
    Cell::new(status).fg(color)
}

async fn list(state: &AppState, params: &OrderListParams, json: bool) -> Result<()> {
    let page = state.orders.list(params).await?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "orders": page.results,
                "count": page.count,
            }))?
        );
        return Ok(());
    }

    if page.results.is_empty() {
        println!();
        println!("  {} No orders found", style("i").blue().bold());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Number").fg(Color::White),
        Cell::new("Service").fg(Color::White),
        Cell::new("Status").fg(Color::White),
        Cell::new("Amount").fg(Color::White),
        Cell::new("Due").fg(Color::White),
    ]);
    for order in &page.results {
        let service = order
            .service
            .as_ref()
            .map(|s| truncate(&s.title, 40))
            .unwrap_or_default();
        let due = order
            .delivery_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(order.id).fg(Color::DarkGrey),
            Cell::new(&order.order_number).fg(Color::Cyan),
            Cell::new(service),
            status_cell(order.status),
            Cell::new(format!("{:.2} {}", order.total_amount, order.currency)),
            Cell::new(due),
        ]);
    }

    let page_size = params.page_size.unwrap_or(state.config.default_page_size);
    println!();
    println!("{table}");
    println!(
        "  {} orders  (page {}/{})",
        page.count,
        params.page.unwrap_or(1),
        page.total_pages(page_size)
    );
    println!();
    Ok(())
}

fn print_order(order: &Order, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(order)?);
        return Ok(());
    }

    println!();
    println!(
        "  {}  {}",
        style(&order.order_number).cyan().bold(),
        style(order.status).bold()
    );
    if let Some(service) = &order.service {
        println!("  {}  {}", style("Service:").bold(), service.title);
    }
    if let Some(seller) = &order.seller {
        println!("  {}  {}", style("Seller:").bold(), seller.display_name());
    }
    if let Some(buyer) = &order.buyer {
        println!("  {}  {}", style("Buyer:").bold(), buyer.display_name());
    }
    println!(
        "  {}  {:.2} {}",
        style("Amount:").bold(),
        order.total_amount,
        order.currency
    );
    if let Some(due) = order.delivery_date {
        println!("  {}  {}", style("Due:").bold(), due.format("%Y-%m-%d %H:%M UTC"));
    }
    println!(
        "  {}  {}",
        style("Revisions left:").bold(),
        order.revisions_remaining
    );
    if let Some(created) = order.created_at {
        println!("  {}  {}", style("Created:").bold(), created.format("%Y-%m-%d %H:%M UTC"));
    }

    if !order.attachments.is_empty() {
        println!();
        println!("  {}", style("Attachments").bold());
        for attachment in &order.attachments {
            let name = if attachment.filename.is_empty() {
                &attachment.file
            } else {
                &attachment.filename
            };
            println!("   {} {name} ({} bytes)", style("•").green(), attachment.file_size);
        }
    }

    if order.status.can_cancel() {
        println!();
        println!(
            "  {} Cancel with: {}",
            style("i").blue().bold(),
            style(format!("flc orders cancel {} --reason \"...\"", order.id)).yellow()
        );
    } else if order.status == OrderStatus::Delivered {
        println!();
        println!(
            "  {} Accept the delivery with: {}",
            style("i").blue().bold(),
            style(format!("flc orders complete {}", order.id)).yellow()
        );
    }
    println!();
    Ok(())
}

async fn cancel(state: &AppState, id: OrderId, reason: &str, yes: bool, json: bool) -> Result<()> {
    let order = state.orders.get(id).await?;
    if !order.status.can_cancel() {
        anyhow::bail!(
            "Order {} is {} and can no longer be cancelled",
            order.order_number,
            order.status
        );
    }

    if !yes && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!("Cancel order {}?", order.order_number))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    let order = state.orders.cancel(id, reason).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&order)?);
    } else {
        println!(
            "  {} Order {} is now {}",
            style("✓").green().bold(),
            style(&order.order_number).cyan(),
            order.status
        );
    }
    Ok(())
}

async fn attach(state: &AppState, id: OrderId, file: PathBuf, json: bool) -> Result<()> {
    let bytes = tokio::fs::read(&file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "attachment".to_string());

    let bar = upload_bar(json);
    let on_progress: ProgressFn = {
        let bar = bar.clone();
        Arc::new(move |fraction: f32| bar.set_position((fraction * 100.0) as u64))
    };
    let result = state
        .orders
        .upload_attachment(id, &name, bytes, Some(on_progress))
        .await;
    bar.finish_and_clear();
    let attachment = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&attachment)?);
    } else {
        println!(
            "  {} Attached {} to order {id}",
            style("✓").green().bold(),
            style(&name).cyan()
        );
    }
    Ok(())
}
