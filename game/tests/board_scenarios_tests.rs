use std::time::Duration;

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use roguetris::{
    Command, Game,
    board::{Board, Cell},
    config::GameConfig,
    phase::GamePhase,
    shapes::PieceKind,
    signals::Signal,
    upgrades::{UpgradeCatalog, UpgradeId, UpgradeOutcome, UpgradeState},
};

fn kind(name: &str) -> PieceKind {
    PieceKind::from_name(name).unwrap()
}

fn quiet_game(pool: &[&str]) -> Game {
    let mut config = GameConfig::default();
    config.obstacles.enabled = false;
    let mut game = Game::new(config, pool.iter().map(|n| kind(n)).collect(), 42);
    assert!(game.apply(Command::Start));
    game
}

fn shift(game: &mut Game, dx: i32) {
    let command = if dx < 0 {
        Command::MoveLeft
    } else {
        Command::MoveRight
    };
    for _ in 0..dx.abs() {
        assert!(game.apply(command));
    }
}

/// Lets gravity and the lock delay finish the piece; no drop bonus.
fn settle(game: &mut Game) {
    game.tick(Duration::from_secs(60));
}

#[test]
fn alternating_i_pieces_flush_left_and_right_clear_nothing() {
    let mut game = quiet_game(&["I"]);
    for _ in 0..4 {
        shift(&mut game, -3);
        assert!(game.apply(Command::HardDrop));
        shift(&mut game, 3);
        assert!(game.apply(Command::HardDrop));
    }
    assert_eq!(game.scoreboard().lines, 0);
    assert_eq!(game.board().occupied_count(), 32);
    for row in 16..20 {
        let cells = &game.board().rows()[row];
        assert!(cells[4].is_empty() && cells[5].is_empty());
    }
}

#[test]
fn filling_a_row_with_i3_pieces_clears_exactly_one_line() {
    let mut game = quiet_game(&["I3"]);
    game.board_mut().set(19, 9, Cell::Occupied(kind("I3")));
    assert_eq!(game.active().map(|p| p.x), Some(3));

    shift(&mut game, -3);
    settle(&mut game);
    settle(&mut game);
    shift(&mut game, 3);
    settle(&mut game);

    assert_eq!(game.scoreboard().lines, 1);
    assert_eq!(game.scoreboard().score, 100);
    assert_eq!(game.board().height(), 20);
    assert_eq!(game.board().rows().len(), 20);
    assert!(game.board().rows()[0].iter().all(|c| c.is_empty()));
    assert_eq!(game.board().occupied_count(), 0);
    assert!(
        game.drain_signals()
            .contains(&Signal::LinesCleared { count: 1, with_obstacle: false, points: 100 })
    );
}

#[test]
fn tough_obstacle_row_degrades_instead_of_clearing() {
    let mut board = Board::new(10, 20);
    for c in 0..9 {
        board.set(19, c, Cell::Occupied(kind("T")));
    }
    board.set(19, 9, Cell::Obstacle(3));

    let clear = board.clear_lines();
    assert_eq!(clear.removed(), 0);
    assert_eq!(clear.degraded_rows, vec![19]);
    assert_eq!(board.get(19, 9), Some(Cell::Obstacle(2)));
    for c in 0..9 {
        assert_eq!(board.get(19, c), Some(Cell::Empty));
    }
}

#[test]
fn a_clear_never_collapses_columns_into_new_lines() {
    let mut board = Board::new(4, 6);
    for c in 0..4 {
        board.set(5, c, Cell::Occupied(kind("T")));
    }
    for c in 0..3 {
        board.set(4, c, Cell::Occupied(kind("T")));
    }
    board.set(3, 3, Cell::Occupied(kind("T")));

    let clear = board.clear_lines();
    assert_eq!(clear.removed(), 1);
    // The lone cell only shifts with the removed row; it does not drop into the gap.
    assert_eq!(board.get(4, 3), Some(Cell::Occupied(kind("T"))));
    assert_eq!(board.get(5, 3), Some(Cell::Empty));
    assert!(!board.is_row_full(5));
    assert_eq!(board.occupied_count(), 4);
}

#[test]
fn degraded_rows_score_nothing_in_a_live_game() {
    let mut game = quiet_game(&["I3"]);
    game.board_mut().set(19, 0, Cell::Obstacle(3));
    for c in 1..7 {
        game.board_mut().set(19, c, Cell::Occupied(kind("I3")));
    }

    shift(&mut game, 4);
    settle(&mut game);

    assert_eq!(game.scoreboard().lines, 0);
    assert_eq!(game.scoreboard().score, 0);
    assert_eq!(game.scoreboard().combo, -1);
    assert_eq!(game.board().get(19, 0), Some(Cell::Obstacle(2)));
    assert_eq!(game.board().occupied_count(), 1);
    assert!(
        game.drain_signals()
            .contains(&Signal::ObstacleRowsWeakened { count: 1 })
    );
}

#[test]
fn expand_board_twice_pads_rows_on_the_right() {
    let mut board = Board::new(10, 20);
    board.set(19, 0, Cell::Occupied(kind("O")));
    board.set(19, 9, Cell::Obstacle(2));
    board.set(5, 4, Cell::Occupied(kind("T")));
    let before = board.clone();

    let catalog = UpgradeCatalog::default();
    let expand = catalog.get(UpgradeId::ExpandBoard).unwrap();
    let mut upgrades = UpgradeState::default();
    let mut rng = Xoshiro256StarStar::seed_from_u64(0);
    for _ in 0..2 {
        match upgrades.apply(expand, 5, &mut rng) {
            UpgradeOutcome::BoardWidened { extra } => board.widen(extra as usize),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    assert_eq!(board.width(), 12);
    assert_eq!(board.height(), 20);
    for (r, row) in board.rows().iter().enumerate() {
        assert_eq!(row.len(), 12);
        assert_eq!(&row[..10], &before.rows()[r][..]);
        assert!(row[10].is_empty() && row[11].is_empty());
    }
}

#[test]
fn spawn_collision_ends_the_run() {
    let mut game = quiet_game(&["P"]);
    let active = *game.active().unwrap();
    assert!(active.cells().contains(&(4, 0)));

    game.board_mut().set(0, 4, Cell::Occupied(kind("P")));
    game.apply(Command::Hold);
    assert_eq!(game.phase(), GamePhase::GameOver);
    assert!(game.active().is_none());
}
