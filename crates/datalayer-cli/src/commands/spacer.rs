use anyhow::{Context as _, Result};
use datalayer_sdk::model::{CreateSpace, Item};

use super::{Context, format_time};
use crate::cli::{DocumentsCommand, ItemsCommand, NotebooksCommand, SpacesCommand};

fn print_item(item: &Item) {
    println!(
        "{:<28} {:<10} {:<32} {}",
        item.uid,
        item.kind.as_str(),
        item.name,
        format_time(item.updated_at.or(item.created_at))
    );
}

pub async fn spaces(ctx: &Context, command: SpacesCommand) -> Result<()> {
    match command {
        SpacesCommand::List => {
            let spaces = ctx.client.list_my_spaces().await?;
            ctx.output.show(&spaces, |spaces| {
                for space in spaces {
                    println!(
                        "{:<28} {:<24} {}{}",
                        space.uid,
                        space.handle,
                        space.name,
                        if space.public { "  (public)" } else { "" }
                    );
                }
            })
        }
        SpacesCommand::Get { uid } => {
            let space = ctx.client.get_space(&uid).await?;
            ctx.output.show(&space, |space| {
                println!("{} (@{})", space.name, space.handle);
                if !space.description.is_empty() {
                    println!("{}", space.description);
                }
                space.items.iter().for_each(print_item);
            })
        }
        SpacesCommand::Create {
            name,
            handle,
            description,
            public,
        } => {
            let request = CreateSpace::new(&name, &handle)
                .with_description(&description)
                .with_public(public);
            let space = ctx
                .client
                .create_space(&request)
                .await
                .context("Failed to create space")?;
            ctx.output
                .show(&space, |space| println!("Created space {} ({})", space.handle, space.uid))
        }
        SpacesCommand::Items { space_uid } => {
            let items = ctx.client.list_space_items(&space_uid).await?;
            ctx.output
                .show(&items, |items| items.iter().for_each(print_item))
        }
    }
}

pub async fn notebooks(ctx: &Context, command: NotebooksCommand) -> Result<()> {
    match command {
        NotebooksCommand::Create {
            space_uid,
            name,
            description,
            file,
        } => {
            let content = match &file {
                Some(path) => Some(
                    tokio::fs::read_to_string(path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?,
                ),
                None => None,
            };
            let notebook = ctx
                .client
                .create_notebook(&space_uid, &name, &description, content.as_deref())
                .await
                .context("Failed to create notebook")?;
            ctx.output.show(&notebook, print_item)
        }
        NotebooksCommand::Get { uid } => {
            let notebook = ctx.client.get_notebook(&uid).await?;
            ctx.output.show(&notebook, print_item)
        }
    }
}

pub async fn documents(ctx: &Context, command: DocumentsCommand) -> Result<()> {
    match command {
        DocumentsCommand::Create {
            space_uid,
            name,
            description,
        } => {
            let document = ctx
                .client
                .create_document(&space_uid, &name, &description)
                .await
                .context("Failed to create document")?;
            ctx.output.show(&document, print_item)
        }
        DocumentsCommand::Get { uid } => {
            let document = ctx.client.get_document(&uid).await?;
            ctx.output.show(&document, print_item)
        }
    }
}

pub async fn items(ctx: &Context, command: ItemsCommand) -> Result<()> {
    match command {
        ItemsCommand::Delete { uid } => {
            ctx.client.delete_item(&uid).await?;
            ctx.output.done(&format!("Deleted item {}", uid))
        }
    }
}
