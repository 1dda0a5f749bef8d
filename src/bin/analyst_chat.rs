use balance_sheet_analyst::{Author, HttpTransport, SessionHandle};
use dotenv::dotenv;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

fn print_new_messages(session: &SessionHandle, shown: &mut usize) {
    let snapshot = session.snapshot();
    for message in snapshot.transcript.iter().skip(*shown) {
        if message.author == Author::Assistant {
            println!("\n{}\n", message.content);
        }
    }
    *shown = snapshot.transcript.len();

    for advisory in session.take_advisories() {
        eprintln!("[{}] {}", advisory.title(), advisory.description());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let base_url =
        std::env::var("ANALYST_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let user_id = std::env::var("ANALYST_USER_ID")
        .map_err(|_| anyhow::anyhow!("ANALYST_USER_ID must be set"))?;

    let transport = Arc::new(HttpTransport::new(base_url, Duration::from_secs(90))?);

    let listing = transport.company_listing(&user_id).await?;
    let selected = std::env::var("ANALYST_COMPANY_ID")
        .ok()
        .and_then(|id| listing.find(&id))
        .or_else(|| listing.default_company())
        .cloned();

    let session = SessionHandle::new(user_id, transport);
    session.open(selected);

    println!("Type a question about the balance sheets ('quit' to exit).");
    println!("------------------------------------------------------------------");
    let mut shown = 0;
    print_new_messages(&session, &mut shown);

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let prompt = input.trim();

        if prompt.eq_ignore_ascii_case("quit") || prompt.eq_ignore_ascii_case("exit") {
            break;
        }

        if prompt.is_empty() {
            continue;
        }

        println!("\nThinking...");
        if !session.submit(prompt).await {
            continue;
        }
        print_new_messages(&session, &mut shown);
        println!("------------------------------------------------------------------");
    }

    session.close();
    Ok(())
}
