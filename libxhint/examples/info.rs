use libxhint::prelude::*;

fn main() -> WindowManagerResult<()> {
    let wm = WindowManager::open(&ConnectOptions::new().prime_ewmh())?;

    // Issue everything up front and claim the replies afterwards
    let desktops = wm.get_number_of_desktops()?;
    let current = wm.get_current_desktop()?;
    let names = wm.get_desktop_names_unchecked()?;
    let active = wm.get_active_window()?;

    let (_, wm_name) = wm.winmgr()?;
    println!("X11 Information");
    println!("-----------------------------------------------------------------------");
    println!("Window Manager:    {}", wm_name);
    println!("Composite Manager: {}", wm.composite_manager()?);
    println!("Root Window:       {}", wm.root());
    println!("Screen Size:       {}x{}", wm.width(), wm.height());
    println!("Desktops:          {}", desktops.reply()?);
    println!("Current Desktop:   {}", current.reply()?);
    println!("Desktop Names:     {:?}", names.reply().unwrap_or_default());
    println!();

    let win = active.reply()?;
    println!("Active Window");
    println!("-----------------------------------------------------------------------");
    println!("ID:                {:0>8}", win);
    println!("Name:              {}", wm.win_name(win)?);
    println!("Class:             {}", wm.win_class(win).unwrap_or_default());
    println!("Geometry:          {}", wm.win_geometry(win)?);
    println!("Type:              {}", wm.win_type(win)?);
    println!("States:            {:?}", wm.win_state(win)?);
    Ok(())
}
