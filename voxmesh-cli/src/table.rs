use colored::*;
use voxmesh::engine::{ConnectionState, MeshView, PeerPhase, PeerStatus};

pub fn print(view: &MeshView) {
    let peers = view.snapshot();

    println!();
    println!(
        "{} {}  {}",
        "Peers:".cyan().bold(),
        peers.len(),
        format!("(local audio: {})", view.local_audio_state()).dimmed()
    );
    if peers.is_empty() {
        println!("   {}", "nobody else here yet".dimmed());
        return;
    }

    println!(
        "   {:<20} {:<10} {:<7} {:<13} {:<13} {:<15} {}",
        "PEER", "TYPE", "POLITE", "PHASE", "LINK", "AUDIO", "CHANNEL"
    );
    for peer in &peers {
        println!("   {}", row(peer));
    }
}

fn row(peer: &PeerStatus) -> String {
    let phase = format!("{:<13}", peer.phase.to_string());
    let phase = match peer.phase {
        PeerPhase::Connected => phase.green(),
        PeerPhase::Negotiating => phase.yellow(),
        PeerPhase::Initializing => phase.dimmed(),
    };

    let link = format!("{:<13}", peer.connection_state.to_string());
    let link = match peer.connection_state {
        ConnectionState::Connected => link.green(),
        ConnectionState::Disconnected => link.yellow(),
        ConnectionState::Failed | ConnectionState::Closed => link.red(),
        ConnectionState::New | ConnectionState::Connecting => link.normal(),
    };

    let audio = format!("{:<15}", peer.remote_audio_state.to_string());
    let audio = if peer.remote_audio_state.is_deafened() {
        audio.red()
    } else if peer.remote_audio_state.is_mic_muted() {
        audio.yellow()
    } else {
        audio.normal()
    };

    format!(
        "{:<20} {:<10} {:<7} {} {} {} {}",
        peer.peer_id.as_str(),
        peer.peer_type,
        if peer.polite { "yes" } else { "no" },
        phase,
        link,
        audio,
        if peer.data_channel_open { "open" } else { "-" }
    )
}
