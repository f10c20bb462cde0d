//! Group admin actions sent below `Client::send_message`: admin revokes
//! and participant removal.

use wacore::send::SignalStores;
use wacore::types::message::{AddressingMode, EditAttribute};
use wacore_binary::builder::NodeBuilder;
use wacore_binary::jid::{Jid, JidExt};
use wacore_binary::node::{Node, NodeContent};
use waproto::whatsapp as wa;
use warden_core::error::WardenError;
use whatsapp_rust::client::Client;
use whatsapp_rust::request::InfoQuery;
use whatsapp_rust::store::signal_adapter::SignalProtocolStoreAdapter;

/// Group admin namespace for IQ requests.
const GROUP_NS: &str = "w:g2";

/// Encrypt `message` for the group and send it with the stanza `edit`
/// attribute set. Returns the message ID.
///
/// Sender keys are always redistributed.
pub(super) async fn send_group_edit(
    client: &Client,
    group: &Jid,
    message: &wa::Message,
    edit: EditAttribute,
) -> Result<String, WardenError> {
    let mut group_info = client
        .groups()
        .query_info(group)
        .await
        .map_err(|e| WardenError::Channel(format!("group info for {group}: {e}")))?;

    let persistence = client.persistence_manager();
    let device = persistence.get_device_snapshot().await;
    let own_pn = device
        .pn
        .clone()
        .ok_or_else(|| WardenError::Channel("whatsapp not logged in".into()))?;
    let own_lid = device
        .lid
        .clone()
        .ok_or_else(|| WardenError::Channel("whatsapp LID not set".into()))?;

    let own_sending_jid = match group_info.addressing_mode {
        AddressingMode::Lid => &own_lid,
        AddressingMode::Pn => &own_pn,
    };
    if !group_info
        .participants
        .iter()
        .any(|p| p.is_same_user_as(own_sending_jid))
    {
        group_info.participants.push(own_sending_jid.to_non_ad());
    }

    let mut adapter = SignalProtocolStoreAdapter::new(persistence.get_device_arc().await);
    let mut stores = SignalStores {
        session_store: &mut adapter.session_store,
        identity_store: &mut adapter.identity_store,
        prekey_store: &mut adapter.pre_key_store,
        signed_prekey_store: &adapter.signed_pre_key_store,
        sender_key_store: &mut adapter.sender_key_store,
    };

    let request_id = client.generate_message_id().await;
    let stanza = wacore::send::prepare_group_stanza(
        &mut stores,
        client,
        &mut group_info,
        &own_pn,
        &own_lid,
        device.account.as_ref(),
        group.clone(),
        message,
        request_id.clone(),
        true,
        None,
        Some(edit),
    )
    .await
    .map_err(|e| WardenError::Channel(format!("encrypt for {group}: {e}")))?;

    client
        .send_node(stanza)
        .await
        .map_err(|e| WardenError::Channel(format!("send to {group}: {e}")))?;
    Ok(request_id)
}

/// `<remove><participant jid=…/></remove>` payload for a group admin IQ.
pub(super) fn remove_participants_node(participants: &[Jid]) -> Node {
    NodeBuilder::new("remove")
        .children(participants.iter().map(|jid| {
            NodeBuilder::new("participant")
                .attr("jid", jid.to_string())
                .build()
        }))
        .build()
}

/// Participants the server refused to act on, as `(jid, error code)`.
///
/// A successful IQ may still carry a per-participant `error` attribute.
pub(super) fn participant_errors(response: &Node, action: &str) -> Vec<(String, String)> {
    let Some(node) = response.get_optional_child(action) else {
        return Vec::new();
    };
    node.get_children_by_tag("participant")
        .into_iter()
        .filter_map(|p| {
            let mut attrs = p.attrs();
            let error = attrs.optional_string("error")?.to_string();
            let jid = attrs.optional_string("jid").unwrap_or_default().to_string();
            Some((jid, error))
        })
        .collect()
}

/// Remove `participant` from `group`. Requires the bot to be a group admin.
pub(super) async fn remove_participant(
    client: &Client,
    group: &Jid,
    participant: &Jid,
) -> Result<(), WardenError> {
    let content = NodeContent::Nodes(vec![remove_participants_node(std::slice::from_ref(
        participant,
    ))]);
    let response = client
        .send_iq(InfoQuery::set(GROUP_NS, group.clone(), Some(content)))
        .await
        .map_err(|e| {
            WardenError::Channel(format!("failed to remove {participant} from {group}: {e}"))
        })?;

    if let Some((jid, code)) = participant_errors(&response, "remove").into_iter().next() {
        return Err(WardenError::Channel(format!(
            "server refused to remove {jid} from {group} (error {code})"
        )));
    }
    Ok(())
}
