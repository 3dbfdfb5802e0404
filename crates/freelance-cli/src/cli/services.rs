//! Service listing commands: list, browse, show, search facets, sort, view
//! mode, favorites, likes, categories, featured and image upload.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Subcommand;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};

use freelance_core::http::ProgressFn;
use freelance_types::listing::{
    ListingParams, ServiceDetail, ServiceId, ServiceSummary, SortBy, SortOrder, ViewMode,
};

use super::{require_login, truncate};
use crate::state::AppState;

#[derive(Subcommand)]
pub enum ServicesCommand {
    /// List services using the saved filters and sort.
    #[command(alias = "ls")]
    List {
        /// Full-text search.
        #[arg(long, short)]
        search: Option<String>,

        /// Category slug for this listing only (overrides the saved facet).
        #[arg(long)]
        category: Option<String>,

        /// Sort key for this listing only.
        #[arg(long)]
        sort: Option<String>,

        /// Results per page.
        #[arg(long)]
        page_size: Option<u32>,

        /// Number of pages to load.
        #[arg(long, default_value = "1")]
        pages: u32,
    },

    /// Browse page by page, loading more on request.
    More {
        /// Full-text search.
        #[arg(long, short)]
        search: Option<String>,
    },

    /// Show one service with its packages and requirements.
    Show {
        /// Service id.
        id: ServiceId,
    },

    /// Save a facet filter (e.g. `category design`). No values clears it.
    Filter {
        /// Facet name (category, tags, price_range, delivery_time, rating...).
        facet: Option<String>,

        /// Facet values; several values match any of them.
        values: Vec<String>,

        /// Remove every saved facet.
        #[arg(long, conflicts_with_all = ["facet", "values"])]
        clear: bool,
    },

    /// Save the default sort.
    Sort {
        /// relevance, price_low, price_high, rating, orders, newest or delivery.
        key: String,

        /// Ascending instead of descending.
        #[arg(long)]
        asc: bool,
    },

    /// Switch between the compact grid and the detailed list view.
    View {
        /// grid or list.
        mode: String,
    },

    /// Toggle a service in your local favorites.
    #[command(alias = "fav")]
    Favorite {
        /// Service id.
        id: ServiceId,
    },

    /// List your local favorites.
    Favorites,

    /// Like a service on the marketplace (--undo withdraws the like).
    Like {
        /// Service id.
        id: ServiceId,

        #[arg(long)]
        undo: bool,
    },

    /// List service categories.
    Categories,

    /// Show the best-selling services.
    Featured,

    /// Upload images to one of your services.
    #[command(name = "upload-images")]
    UploadImages {
        /// Service id.
        id: ServiceId,

        /// Image files.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Handle a services subcommand.
pub async fn handle_services_command(cmd: ServicesCommand, state: &AppState, json: bool) -> Result<()> {
    match cmd {
        ServicesCommand::List {
            search,
            category,
            sort,
            page_size,
            pages,
        } => list(state, search, category, sort, page_size, pages, json).await,
        ServicesCommand::More { search } => browse(state, search, json).await,
        ServicesCommand::Show { id } => show(state, id, json).await,
        ServicesCommand::Filter {
            facet,
            values,
            clear,
        } => filter(state, facet, values, clear, json).await,
        ServicesCommand::Sort { key, asc } => sort(state, &key, asc, json).await,
        ServicesCommand::View { mode } => view(state, &mode, json).await,
        ServicesCommand::Favorite { id } => favorite(state, id, json).await,
        ServicesCommand::Favorites => favorites(state, json),
        ServicesCommand::Like { id, undo } => like(state, id, undo, json).await,
        ServicesCommand::Categories => categories(state, json).await,
        ServicesCommand::Featured => featured(state, json).await,
        ServicesCommand::UploadImages { id, files } => upload_images(state, id, files, json).await,
    }
}

fn render_services(state: &AppState, services: &[ServiceSummary]) {
    let listing = state.services.state();
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    match listing.view_mode {
        ViewMode::Grid => {
            table.set_header(vec![
                Cell::new("").fg(Color::White),
                Cell::new("ID").fg(Color::White),
                Cell::new("Title").fg(Color::White),
                Cell::new("Price").fg(Color::White),
                Cell::new("Rating").fg(Color::White),
            ]);
            for service in services {
                table.add_row(vec![
                    Cell::new(favorite_mark(&listing.favorites, service.id)).fg(Color::Yellow),
                    Cell::new(service.id).fg(Color::DarkGrey),
                    Cell::new(truncate(&service.title, 40)).fg(Color::Cyan),
                    Cell::new(format!("¥{:.2}", service.price)),
                    Cell::new(format!("{:.1}", service.average_rating)),
                ]);
            }
        }
        ViewMode::List => {
            table.set_header(vec![
                Cell::new("").fg(Color::White),
                Cell::new("ID").fg(Color::White),
                Cell::new("Title").fg(Color::White),
                Cell::new("Seller").fg(Color::White),
                Cell::new("Price").fg(Color::White),
                Cell::new("Delivery").fg(Color::White),
                Cell::new("Rating").fg(Color::White),
                Cell::new("Orders").fg(Color::White),
                Cell::new("Likes").fg(Color::White),
            ]);
            for service in services {
                let seller = service
                    .seller
                    .as_ref()
                    .map(|s| s.display_name())
                    .unwrap_or_default();
                table.add_row(vec![
                    Cell::new(favorite_mark(&listing.favorites, service.id)).fg(Color::Yellow),
                    Cell::new(service.id).fg(Color::DarkGrey),
                    Cell::new(truncate(&service.title, 60)).fg(Color::Cyan),
                    Cell::new(seller),
                    Cell::new(format!("¥{:.2}", service.price)),
                    Cell::new(format!("{} days", service.delivery_time)),
                    Cell::new(format!(
                        "{:.1} ({})",
                        service.average_rating, service.total_reviews
                    )),
                    Cell::new(service.order_count),
                    Cell::new(service.likes),
                ]);
            }
        }
    }

    println!("{table}");
}

fn favorite_mark(favorites: &std::collections::BTreeSet<ServiceId>, id: ServiceId) -> &'static str {
    if favorites.contains(&id) { "★" } else { "" }
}

fn print_page_footer(state: &AppState) {
    let listing = state.services.state();
    println!(
        "  {} of {} services  (page {}/{})",
        listing.services.len(),
        listing.query.total_count,
        listing.query.current_page,
        listing.query.total_pages,
    );
    if !listing.query.filters.is_empty() {
        let facets: Vec<String> = listing
            .query
            .filters
            .iter()
            .map(|(facet, values)| format!("{facet}={}", values.join(",")))
            .collect();
        println!("  {} {}", style("Filters:").dim(), facets.join("  "));
    }
    println!();
}

fn print_services_json(state: &AppState) -> Result<()> {
    let listing = state.services.state();
    let result = serde_json::json!({
        "services": listing.services,
        "count": listing.query.total_count,
        "current_page": listing.query.current_page,
        "total_pages": listing.query.total_pages,
    });
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn list(
    state: &AppState,
    search: Option<String>,
    category: Option<String>,
    sort: Option<String>,
    page_size: Option<u32>,
    pages: u32,
    json: bool,
) -> Result<()> {
    let mut params = ListingParams {
        page_size,
        ..Default::default()
    };
    if let Some(sort) = sort {
        params.sort_by = Some(sort.parse::<SortBy>().map_err(|e| anyhow::anyhow!(e))?);
    }
    if let Some(category) = category {
        params.filters.insert("category".to_string(), vec![category]);
    }
    if let Some(search) = search {
        state.services.set_search_query(&search);
    }

    state.services.fetch_services(params.clone(), true).await?;
    for _ in 1..pages.max(1) {
        let next = state.services.state().query.current_page + 1;
        if !state.services.state().query.has_more() {
            break;
        }
        state
            .services
            .fetch_services(ListingParams { page: Some(next), ..params.clone() }, false)
            .await?;
    }

    if json {
        return print_services_json(state);
    }

    let listing = state.services.state();
    if listing.services.is_empty() {
        println!();
        println!(
            "  {} No services match. Clear saved filters with: {}",
            style("i").blue().bold(),
            style("flc services filter --clear").yellow()
        );
        println!();
        return Ok(());
    }

    println!();
    render_services(state, &listing.services);
    print_page_footer(state);
    Ok(())
}

async fn browse(state: &AppState, search: Option<String>, json: bool) -> Result<()> {
    match search {
        Some(search) => state.services.search_services(&search).await?,
        None => state.services.fetch_services(ListingParams::default(), true).await?,
    };

    if json {
        return print_services_json(state);
    }

    let mut shown = 0;
    loop {
        let listing = state.services.state();
        println!();
        render_services(state, &listing.services[shown..]);
        shown = listing.services.len();
        print_page_footer(state);

        if !listing.query.has_more() {
            println!("  {} End of results", style("i").blue().bold());
            return Ok(());
        }
        let more = Confirm::new()
            .with_prompt("Load more?")
            .default(true)
            .interact()?;
        if !more || !state.services.fetch_more_services().await? {
            return Ok(());
        }
    }
}

async fn show(state: &AppState, id: ServiceId, json: bool) -> Result<()> {
    let detail = state.services.fetch_service(id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }
    print_detail(state, &detail);
    Ok(())
}

fn print_detail(state: &AppState, detail: &ServiceDetail) {
    let s = &detail.summary;
    println!();
    println!(
        "  {}{}",
        style(&s.title).cyan().bold(),
        if state.services.is_favorite(s.id) { "  ★" } else { "" }
    );
    if let Some(seller) = &s.seller {
        println!("  {}  {}", style("Seller:").bold(), seller.display_name());
    }
    if let Some(category) = &s.category {
        println!("  {}  {}", style("Category:").bold(), category.name);
    }
    println!("  {}  ¥{:.2}", style("Price:").bold(), s.price);
    println!("  {}  {} days", style("Delivery:").bold(), s.delivery_time);
    println!(
        "  {}  {:.1} ({} reviews, {} orders)",
        style("Rating:").bold(),
        s.average_rating,
        s.total_reviews,
        s.order_count
    );
    if !s.tags.is_empty() {
        println!("  {}  {}", style("Tags:").bold(), s.tags.join(", "));
    }
    if !s.description.is_empty() {
        println!();
        for line in s.description.lines() {
            println!("  {line}");
        }
    }
    if !detail.features.is_empty() {
        println!();
        for feature in &detail.features {
            println!("  {} {feature}", style("•").green());
        }
    }

    if !detail.packages.is_empty() {
        println!();
        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL_CONDENSED);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Package").fg(Color::White),
            Cell::new("Price").fg(Color::White),
            Cell::new("Delivery").fg(Color::White),
            Cell::new("Revisions").fg(Color::White),
        ]);
        for package in &detail.packages {
            let name = if package.is_popular {
                format!("{} (popular)", package.name)
            } else {
                package.name.clone()
            };
            table.add_row(vec![
                Cell::new(name).fg(Color::Cyan),
                Cell::new(format!("¥{:.2}", package.price)),
                Cell::new(format!("{} days", package.delivery_time)),
                Cell::new(package.revisions),
            ]);
        }
        println!("{table}");
    }

    if !detail.requirements.is_empty() {
        println!();
        println!("  {}", style("Buyer requirements").bold());
        for req in &detail.requirements {
            let marker = if req.required { "*" } else { " " };
            println!("   {marker} {} ({})", req.title, req.kind);
        }
    }
    println!();
}

async fn filter(
    state: &AppState,
    facet: Option<String>,
    values: Vec<String>,
    clear: bool,
    json: bool,
) -> Result<()> {
    if clear {
        state.services.clear_filters().await;
    } else {
        let facet = facet.context("Pass a facet name, or --clear")?;
        let values: Vec<String> = values
            .iter()
            .flat_map(|v| v.split(','))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        state.services.set_filter(&facet, values).await;
    }

    let filters = state.services.state().query.filters;
    if json {
        println!("{}", serde_json::json!({ "filters": filters }));
    } else if filters.is_empty() {
        println!("  {} No saved filters", style("✓").green().bold());
    } else {
        println!("  {} Saved filters:", style("✓").green().bold());
        for (facet, values) in &filters {
            println!("     {} {}", style(format!("{facet}:")).bold(), values.join(", "));
        }
    }
    Ok(())
}

async fn sort(state: &AppState, key: &str, asc: bool, json: bool) -> Result<()> {
    let sort_by: SortBy = key.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let sort_order = if asc { SortOrder::Asc } else { SortOrder::Desc };
    state.services.set_sort_by(sort_by, sort_order).await;

    if json {
        println!("{}", serde_json::json!({"sort_by": sort_by, "sort_order": sort_order}));
    } else {
        println!(
            "  {} Sorting by {} ({})",
            style("✓").green().bold(),
            style(sort_by).cyan(),
            sort_order
        );
    }
    Ok(())
}

async fn view(state: &AppState, mode: &str, json: bool) -> Result<()> {
    let mode: ViewMode = mode.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    state.services.set_view_mode(mode).await;
    if json {
        println!("{}", serde_json::json!({ "view_mode": mode }));
    } else {
        println!("  {} View mode set to {}", style("✓").green().bold(), style(mode).cyan());
    }
    Ok(())
}

async fn favorite(state: &AppState, id: ServiceId, json: bool) -> Result<()> {
    let now_favorite = state.services.toggle_favorite(id).await;
    if json {
        println!("{}", serde_json::json!({"id": id, "favorite": now_favorite}));
    } else if now_favorite {
        println!("  {} Added service {id} to favorites", style("★").yellow());
    } else {
        println!("  {} Removed service {id} from favorites", style("☆").dim());
    }
    Ok(())
}

async fn like(state: &AppState, id: ServiceId, undo: bool, json: bool) -> Result<()> {
    require_login(state)?;
    if undo {
        state.services.unlike_service(id).await?;
    } else {
        state.services.like_service(id).await?;
    }
    if json {
        println!("{}", serde_json::json!({"id": id, "liked": !undo}));
    } else if undo {
        println!("  {} Withdrew your like from service {id}", style("✓").green().bold());
    } else {
        println!("  {} Liked service {id}", style("♥").red());
    }
    Ok(())
}

fn favorites(state: &AppState, json: bool) -> Result<()> {
    let favorites = state.services.favorites();
    if json {
        println!("{}", serde_json::json!({ "favorites": favorites }));
        return Ok(());
    }
    if favorites.is_empty() {
        println!();
        println!(
            "  {} No favorites yet. Add one with: {}",
            style("i").blue().bold(),
            style("flc services favorite <id>").yellow()
        );
        println!();
        return Ok(());
    }
    println!();
    println!("  Favorites ({}):", favorites.len());
    for id in &favorites {
        println!("   {} {id}", style("★").yellow());
    }
    println!("     Details with: {}", style("flc services show <id>").yellow());
    println!();
    Ok(())
}

async fn categories(state: &AppState, json: bool) -> Result<()> {
    let categories = state.services.fetch_categories().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&categories)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Slug").fg(Color::White),
        Cell::new("Name").fg(Color::White),
        Cell::new("Services").fg(Color::White),
        Cell::new("Subcategories").fg(Color::White),
    ]);
    for category in categories.iter().filter(|c| c.is_active) {
        let subs: Vec<&str> = category.subcategories.iter().map(|s| s.name.as_str()).collect();
        table.add_row(vec![
            Cell::new(&category.slug).fg(Color::DarkGrey),
            Cell::new(&category.name).fg(Color::Cyan),
            Cell::new(category.service_count),
            Cell::new(truncate(&subs.join(", "), 50)),
        ]);
    }
    println!();
    println!("{table}");
    println!();
    Ok(())
}

async fn featured(state: &AppState, json: bool) -> Result<()> {
    let featured = state.services.fetch_featured_services().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&featured)?);
        return Ok(());
    }
    println!();
    println!("  {}", style("Best sellers").bold());
    render_services(state, &featured);
    println!();
    Ok(())
}

async fn upload_images(state: &AppState, id: ServiceId, files: Vec<PathBuf>, json: bool) -> Result<()> {
    require_login(state)?;
    let mut images = Vec::with_capacity(files.len());
    for path in &files {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string());
        images.push((name, bytes));
    }

    let bar = upload_bar(json);
    let on_progress: ProgressFn = {
        let bar = bar.clone();
        Arc::new(move |fraction: f32| bar.set_position((fraction * 100.0) as u64))
    };
    let result = state
        .services
        .api()
        .upload_images(id, images, Some(on_progress))
        .await;
    bar.finish_and_clear();
    let uploaded = result?;

    if json {
        println!("{}", serde_json::json!({"id": id, "images": uploaded.images}));
    } else {
        println!(
            "  {} Uploaded {} image(s) to service {id}",
            style("✓").green().bold(),
            files.len()
        );
    }
    Ok(())
}

/// Percentage bar for uploads; hidden in JSON mode.
pub(crate) fn upload_bar(json: bool) -> ProgressBar {
    if json {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:30.cyan/blue} {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message("uploading");
    bar
}
