//! End-to-end scenarios across vault, credentials, governance and timelock.

use std::io::Write;

use hopestream_admission::Decision;
use hopestream_dao::{Dao, DaoConfig};
use hopestream_governance::{ProposalAction, ProposalState};
use hopestream_nullables::NullClock;
use hopestream_types::{
    Address, Amount, AntiSybilParams, Event, VoteSupport, ONE_DAY_SECS,
};
use hopestream_vault::VaultCall;

const DAY: u64 = ONE_DAY_SECS;
const START: u64 = 1_700_000_000;

fn test_address(n: u8) -> Address {
    Address::repeat_byte(n)
}

fn admin() -> Address {
    DaoConfig::default().admin
}

fn new_dao(clock: &NullClock) -> Dao<&NullClock> {
    Dao::new(DaoConfig::default(), clock).expect("default config is valid")
}

/// Events recorded since `from`.
fn events_since<C: hopestream_types::Clock>(dao: &Dao<C>, from: usize) -> Vec<Event> {
    dao.audit().since(from as u64).iter().map(|r| r.event.clone()).collect()
}

#[test]
fn donation_below_minimum_is_kept_without_credential() {
    let clock = NullClock::new(START);
    let mut dao = new_dao(&clock);
    let donor = test_address(20);
    let mark = dao.audit().len();

    let decision = dao.donate(donor, Amount::new(5_000_000_000_000_000)).unwrap();
    assert_eq!(
        decision,
        Decision::BelowThreshold { required: Amount::milliether(10) }
    );
    assert_eq!(
        events_since(&dao, mark),
        vec![
            Event::DonationReceived { donor, amount: Amount::milliether(5) },
            Event::DonationBelowThreshold {
                donor,
                amount: Amount::milliether(5),
                required: Amount::milliether(10),
            },
        ]
    );
    let info = dao.donor_info(&donor);
    assert_eq!(info.credential_count, 0);
    assert_eq!(info.total_donated, Amount::milliether(5));
    assert_eq!(dao.stats().total_donated, Amount::milliether(5));
    assert_eq!(dao.ledger().weight_of(&donor), Amount::ZERO);
}

#[test]
fn cooldown_blocks_second_credential_until_it_passes() {
    let clock = NullClock::new(START);
    let mut dao = new_dao(&clock);
    let donor = test_address(21);

    assert!(dao.donate(donor, Amount::milliether(100)).unwrap().is_mint());
    assert_eq!(dao.donor_info(&donor).credential_count, 1);
    assert_eq!(dao.ledger().weight_of(&donor), Amount::milliether(100));

    let decision = dao.donate(donor, Amount::milliether(100)).unwrap();
    assert!(matches!(decision, Decision::InCooldown { .. }));
    assert_eq!(dao.audit().last(), Some(&Event::DonationInCooldown { donor }));
    assert_eq!(dao.donor_info(&donor).credential_count, 1);
    assert_eq!(dao.stats().total_donated, Amount::milliether(200));

    clock.advance(3_601);
    assert!(dao.donate(donor, Amount::milliether(100)).unwrap().is_mint());
    let info = dao.donor_info(&donor);
    assert_eq!(info.credential_count, 2);
    assert_eq!(dao.ledger().weight_of(&donor), Amount::milliether(200));
    assert_eq!(info.total_donated, Amount::milliether(300));
    // Third credential sits on the progressive curve: 1.5x the minimum.
    assert_eq!(info.next_required_amount, Amount::milliether(15));
}

#[test]
fn proposal_lifecycle_changes_beneficiary() {
    let clock = NullClock::new(START);
    let mut dao = new_dao(&clock);
    let proposer = test_address(30);
    let new_beneficiary = test_address(31);

    dao.donate(proposer, Amount::milliether(100)).unwrap();
    dao.delegate(proposer, proposer).unwrap();
    assert_eq!(dao.voting_power(&proposer), Amount::milliether(100));

    let id = dao
        .propose(
            proposer,
            ProposalAction::ChangeBeneficiary(new_beneficiary),
            "Move payouts to the new field office",
        )
        .unwrap();
    assert_eq!(dao.state(&id).unwrap(), ProposalState::Pending);

    clock.advance(DAY);
    assert_eq!(dao.state(&id).unwrap(), ProposalState::Active);
    assert_eq!(
        dao.cast_vote(proposer, id, VoteSupport::For).unwrap(),
        Amount::milliether(100)
    );

    clock.advance(7 * DAY + 1);
    assert_eq!(dao.state(&id).unwrap(), ProposalState::Succeeded);
    let eta = dao.queue(id).unwrap();
    assert_eq!(dao.state(&id).unwrap(), ProposalState::Queued);

    assert_eq!(dao.execute(id).unwrap_err().code(), "OperationNotReady");
    assert_eq!(dao.stats().beneficiary, DaoConfig::default().beneficiary);

    clock.set(eta.as_secs());
    dao.execute(id).unwrap();
    assert_eq!(dao.state(&id).unwrap(), ProposalState::Executed);
    assert_eq!(dao.stats().beneficiary, new_beneficiary);
    assert!(dao.audit().records().iter().any(|r| r.event
        == Event::BeneficiaryChanged {
            old: DaoConfig::default().beneficiary,
            new: new_beneficiary,
        }));
    assert_eq!(dao.audit().last(), Some(&Event::CallExecuted {
        op: dao.proposal(&id).unwrap().operation.unwrap(),
        index: 0,
        target: DaoConfig::default().vault,
        value: Amount::ZERO,
    }));
}

#[test]
fn milestone_releases_only_after_maturation() {
    let clock = NullClock::new(START);
    let mut dao = new_dao(&clock);
    dao.donate(test_address(40), Amount::ether(2)).unwrap();
    dao.add_milestone(admin(), Amount::ether(1), None).unwrap();

    clock.advance(29 * DAY);
    assert!(dao.release_funds(admin()).unwrap().is_empty());
    assert_eq!(dao.stats().total_released, Amount::ZERO);

    clock.advance(2 * DAY);
    let mark = dao.audit().len();
    assert_eq!(dao.release_funds(admin()).unwrap(), vec![0]);
    assert_eq!(dao.stats().total_released, Amount::ether(1));
    assert_eq!(dao.vault().disbursed_to(&DaoConfig::default().beneficiary), Amount::ether(1));
    assert_eq!(
        events_since(&dao, mark),
        vec![Event::MilestoneReleased {
            index: 0,
            amount: Amount::ether(1),
            timestamp: clock_now(&clock),
        }]
    );
}

fn clock_now(clock: &NullClock) -> hopestream_types::Timestamp {
    hopestream_types::Clock::now(clock)
}

#[test]
fn split_donations_never_amplify_weight() {
    let clock = NullClock::new(START);
    let mut dao = new_dao(&clock);
    let minimum = dao.anti_sybil_parameters().minimum_donation_for_credential;
    let sybils = [test_address(50), test_address(51)];

    for round in 0..3 {
        for s in sybils {
            let decision = dao.donate(s, minimum).unwrap();
            assert_eq!(decision.is_mint(), round == 0);
        }
        clock.advance(60);
    }

    let credentials: u32 = sybils.iter().map(|s| dao.donor_info(s).credential_count).sum();
    let weight: Amount = sybils.iter().map(|s| dao.ledger().weight_of(s)).sum();
    assert_eq!(credentials, 2);
    assert_eq!(weight, Amount::milliether(20));
    assert_eq!(dao.ledger().total_supply(), Amount::milliether(20));
}

#[test]
fn relayer_from_config_can_release() {
    let clock = NullClock::new(START);
    let relayer = test_address(60);
    let config = DaoConfig {
        relayer: Some(relayer),
        ..DaoConfig::default()
    };
    let mut dao = Dao::new(config, &clock).unwrap();
    dao.donate(test_address(61), Amount::ether(1)).unwrap();
    let release_at = clock_now(&clock).plus(DAY);
    dao.add_milestone(admin(), Amount::milliether(500), Some(release_at)).unwrap();

    assert_eq!(dao.add_milestone(relayer, Amount::ether(1), None).unwrap_err().code(), "Unauthorized");
    clock.set(release_at.as_secs());
    assert_eq!(dao.release_funds(relayer).unwrap(), vec![0]);
    assert_eq!(dao.stats().balance, Amount::milliether(500));
}

#[test]
fn anti_sybil_update_through_governance() {
    let clock = NullClock::new(START);
    let mut dao = new_dao(&clock);
    let whale = test_address(70);
    dao.donate(whale, Amount::ether(1)).unwrap();
    dao.delegate(whale, whale).unwrap();

    let params = AntiSybilParams::new(Amount::milliether(50), 5, 7_200);
    let id = dao
        .propose(whale, ProposalAction::UpdateAntiSybilParams(params), "Raise the bar")
        .unwrap();
    clock.advance(DAY);
    dao.cast_vote(whale, id, VoteSupport::For).unwrap();
    clock.advance(7 * DAY + 1);
    let eta = dao.queue(id).unwrap();
    clock.set(eta.as_secs());
    dao.execute(id).unwrap();

    assert_eq!(dao.anti_sybil_parameters(), params);
    let newcomer = test_address(71);
    assert_eq!(
        dao.donate(newcomer, Amount::milliether(20)).unwrap(),
        Decision::BelowThreshold { required: Amount::milliether(50) }
    );
}

#[test]
fn emergency_action_forwards_timelock_funds() {
    let clock = NullClock::new(START);
    let mut dao = new_dao(&clock);
    let member = test_address(80);
    dao.donate(member, Amount::ether(1)).unwrap();
    dao.delegate(member, member).unwrap();
    let funder = test_address(81);
    let mark = dao.audit().len();
    dao.fund_timelock(funder, Amount::ether(3)).unwrap();
    assert_eq!(
        events_since(&dao, mark),
        vec![Event::TimelockFunded { from: funder, amount: Amount::ether(3) }]
    );
    assert_eq!(dao.fund_timelock(Address::ZERO, Amount::ether(1)).unwrap_err().code(), "InvalidAddress");

    let action = ProposalAction::EmergencyAction(vec![
        (Amount::ZERO, VaultCall::Pause),
        (Amount::ether(3), VaultCall::DonateFromDao),
    ]);
    let id = dao.propose(member, action, "Freeze and top up").unwrap();
    clock.advance(DAY);
    dao.cast_vote(member, id, VoteSupport::For).unwrap();
    clock.advance(7 * DAY + 1);
    let eta = dao.queue(id).unwrap();
    clock.set(eta.as_secs());
    dao.execute(id).unwrap();

    let stats = dao.stats();
    assert!(stats.paused);
    assert_eq!(stats.total_donated, Amount::ether(4));
    assert_eq!(dao.governance().timelock().balance(), Amount::ZERO);
    assert_eq!(dao.donate(member, Amount::ether(1)).unwrap_err().code(), "EnforcedPause");
}

#[test]
fn defeated_proposal_cannot_be_queued() {
    let clock = NullClock::new(START);
    let mut dao = new_dao(&clock);
    let yes = test_address(90);
    let no = test_address(91);
    dao.donate(yes, Amount::milliether(100)).unwrap();
    dao.donate(no, Amount::milliether(300)).unwrap();
    dao.delegate(yes, yes).unwrap();
    dao.delegate(no, no).unwrap();

    let id = dao.propose(yes, ProposalAction::Pause, "Pause donations").unwrap();
    clock.advance(DAY);
    dao.cast_vote(yes, id, VoteSupport::For).unwrap();
    dao.cast_vote(no, id, VoteSupport::Against).unwrap();
    assert_eq!(dao.cast_vote(no, id, VoteSupport::For).unwrap_err().code(), "AlreadyVoted");
    assert_eq!(
        dao.proposal_votes(&id).unwrap(),
        (Amount::milliether(300), Amount::milliether(100), Amount::ZERO)
    );

    clock.advance(7 * DAY + 1);
    assert_eq!(dao.state(&id).unwrap(), ProposalState::Defeated);
    assert_eq!(dao.queue(id).unwrap_err().code(), "UnexpectedProposalState");
    assert!(!dao.stats().paused);
}

#[test]
fn config_file_drives_deployment() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
log_level = "debug"
beneficiary = "0x{beneficiary}"

[anti_sybil]
minimum_donation_for_credential = "0.1 ETH"
max_credentials_per_address = 2
donation_cooldown_secs = 0
"#,
        beneficiary = "ab".repeat(20)
    )
    .unwrap();

    let config = DaoConfig::from_toml_file(file.path()).unwrap();
    assert_eq!(config.log_level, "debug");
    let clock = NullClock::new(START);
    let mut dao = Dao::new(config, &clock).unwrap();
    assert_eq!(dao.stats().beneficiary, Address::repeat_byte(0xab));

    let donor = test_address(100);
    assert!(dao.donate(donor, Amount::milliether(100)).unwrap().is_mint());
    assert!(dao.donate(donor, Amount::milliether(100)).unwrap().is_mint());
    assert_eq!(dao.donate(donor, Amount::ether(1)).unwrap(), Decision::MaxReached);
    assert_eq!(dao.donor_info(&donor).credential_count, 2);
}

#[test]
fn missing_config_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = DaoConfig::from_toml_file(dir.path().join("absent.toml")).unwrap_err();
    assert_eq!(err.code(), "Config");
}

#[test]
fn audit_records_serialize_as_json_lines() {
    let clock = NullClock::new(START);
    let mut dao = new_dao(&clock);
    dao.donate(test_address(110), Amount::milliether(100)).unwrap();
    let last = dao.audit().records().last().unwrap();
    let json = serde_json::to_value(last).unwrap();
    assert_eq!(json["event"], "CredentialMinted");
    assert_eq!(json["at"], START);
    assert_eq!(json["amount"], "100000000000000000");
}

#[test]
fn credentials_are_soulbound() {
    let clock = NullClock::new(START);
    let mut dao = new_dao(&clock);
    let holder = test_address(120);
    let buyer = test_address(121);
    dao.donate(holder, Amount::milliether(100)).unwrap();
    let mark = dao.audit().len();

    assert_eq!(
        dao.transfer_credential(holder, holder, buyer, 0).unwrap_err().code(),
        "SoulboundViolation"
    );
    assert_eq!(dao.approve_credential(holder, buyer, 0).unwrap_err().code(), "SoulboundViolation");
    assert_eq!(
        dao.set_credential_approval_for_all(holder, buyer, true).unwrap_err().code(),
        "SoulboundViolation"
    );

    assert_eq!(dao.ledger().owner_of(0).unwrap(), holder);
    assert_eq!(dao.ledger().weight_of(&buyer), Amount::ZERO);
    assert_eq!(dao.audit().len(), mark);
}
