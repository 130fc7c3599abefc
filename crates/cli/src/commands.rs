use anyhow::Context;
use goweli_app::modules::books::{
    models::{Book, BookDraft, BookPatch},
    repository::BookRepository,
    service::Library,
};
use goweli_app::App;
use goweli_catalog::{AcceptFirst, CoverDecider};

use crate::prompt::PromptDecider;
use crate::Command;

pub async fn dispatch(app: App, command: Command) -> anyhow::Result<()> {
    tracing::debug!(?command, "running command");
    let library = app.library();

    match command {
        Command::Serve => return app.serve(goweli_http::shutdown_signal()).await,

        Command::List { read, unread } => {
            let books: Vec<Book> = library
                .list()
                .await?
                .into_iter()
                .filter(|book| (!read || book.is_checked) && (!unread || !book.is_checked))
                .collect();
            if books.is_empty() {
                let message = match (read, unread) {
                    (true, _) => "No books marked as read.",
                    (_, true) => "No unread books.",
                    _ => "No books yet.",
                };
                println!("{message}");
            } else {
                print_books(&books);
            }
        }

        Command::Show { id } => print_details(&library.get(id).await?),

        Command::Add {
            title,
            author,
            isbn,
            synopsis,
            read,
            cover_url,
            no_cover,
            accept_first,
        } => {
            let draft = BookDraft {
                book_title: title,
                author_name: author,
                isbn,
                synopsis,
                is_checked: read,
                cover_url,
            };

            let book = if no_cover {
                Library::without_catalog(BookRepository::new(app.pool().clone()))
                    .add(draft, &mut AcceptFirst)
                    .await?
            } else {
                let mut decider: Box<dyn CoverDecider> = if accept_first {
                    Box::new(AcceptFirst)
                } else {
                    Box::new(PromptDecider::stdin())
                };
                library.add(draft, decider.as_mut()).await?
            };

            println!("Book added successfully.");
            print_details(&book);
        }

        Command::Edit {
            id,
            title,
            author,
            isbn,
            synopsis,
            cover_url,
            read,
        } => {
            let patch = BookPatch {
                book_title: title,
                author_name: author,
                isbn,
                synopsis,
                is_checked: read,
                cover_url,
            };
            let book = library.edit(id, patch).await?;
            println!("Book updated successfully.");
            print_details(&book);
        }

        Command::ToggleRead { id } => {
            let book = library.toggle_read(id).await?;
            let state = if book.is_checked { "read" } else { "unread" };
            println!("Marked \"{}\" as {state}.", book.book_title);
        }

        Command::Delete { id } => {
            let book = library.delete(id).await?;
            println!("Deleted \"{}\" by {}.", book.book_title, book.author_name);
        }

        Command::Search { text, by } => {
            let books = library.search(by.into(), &text).await?;
            if books.is_empty() {
                println!("No books found.");
            } else {
                print_books(&books);
            }
        }

        Command::Covers { title } => {
            let candidates = library.cover_candidates(&title).await?;
            if candidates.is_empty() {
                println!("No book covers found.");
            }
            for candidate in candidates {
                println!("{:<5} {:<12} {}", format!("{:?}", candidate.kind).to_lowercase(), candidate.key, candidate.url);
            }
        }

        Command::Export { output } => {
            let json = library.export_json().await?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, json)
                        .await
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Exported to {}.", path.display());
                }
                None => println!("{json}"),
            }
        }

        Command::Import { file } => {
            let json = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let imported = library.import_json(&json).await?;
            println!("Imported {imported} books.");
        }
    }

    Ok(())
}

fn print_books(books: &[Book]) {
    for book in books {
        let mark = if book.is_checked { "x" } else { " " };
        println!(
            "[{mark}] {:>4}  {} by {}",
            book.id, book.book_title, book.author_name
        );
    }
}

fn print_details(book: &Book) {
    println!("ID:       {}", book.id);
    println!("Title:    {}", book.book_title);
    println!("Author:   {}", book.author_name);
    println!("ISBN:     {}", book.isbn.as_deref().unwrap_or("-"));
    println!("Read:     {}", if book.is_checked { "yes" } else { "no" });
    println!("Cover:    {}", book.cover_url.as_deref().unwrap_or("-"));
    if let Some(synopsis) = &book.synopsis {
        println!("Synopsis: {synopsis}");
    }
}
