use argh::FromArgs;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use challenge_cam::client::{ChallengeApi, HttpChallengeApi};
use std::path::PathBuf;

// defaults for the client
const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 3000;

#[derive(FromArgs)]
/// Challenge client for sending frames and translating the replies
struct ClientArgs {
    /// the host to connect to
    #[argh(option, short = 'h', default = "DEFAULT_HOST.to_string()")]
    host: String,

    /// the port to connect to
    #[argh(option, short = 'p', default = "DEFAULT_PORT")]
    port: u16,

    /// command to execute: "challenge" or "translate"
    #[argh(subcommand)]
    command: ClientCommands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum ClientCommands {
    Challenge(ChallengeCommand),
    Translate(TranslateCommand),
}

#[derive(FromArgs)]
/// Send a JPEG image and print the challenge
#[argh(subcommand, name = "challenge")]
struct ChallengeCommand {
    /// the path to the image
    #[argh(option, short = 'i')]
    image_path: PathBuf,

    /// also print the English translation
    #[argh(switch, short = 't')]
    translate: bool,
}

#[derive(FromArgs)]
/// Translate a line of Manglish
#[argh(subcommand, name = "translate")]
struct TranslateCommand {
    /// the text to translate
    #[argh(positional)]
    text: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: ClientArgs = argh::from_env();

    // format the host and port
    let api = HttpChallengeApi::new(format!("http://{}:{}", args.host, args.port));

    match args.command {
        ClientCommands::Challenge(command) => {
            let jpeg = std::fs::read(&command.image_path)?;
            let image = format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg));

            let text = api.challenge(image).await?;
            println!("Challenge: {}", text);

            if command.translate {
                println!("Translation: {}", api.translate(text).await?);
            }
        }
        ClientCommands::Translate(command) => {
            println!("Translation: {}", api.translate(command.text).await?);
        }
    }

    Ok(())
}
